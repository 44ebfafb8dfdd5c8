//! Extraction benchmarks

use bookreader_core::extractor::{Extractor, EpubExtractor};
use criterion::{criterion_group, criterion_main, Criterion};
use std::io::{Cursor, Write};

const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

fn sample_epub(chapters: usize) -> Vec<u8> {
    let mut manifest = String::new();
    let mut spine = String::new();
    for i in 0..chapters {
        manifest.push_str(&format!(
            r#"<item id="ch{i}" href="ch{i}.xhtml" media-type="application/xhtml+xml"/>"#
        ));
        spine.push_str(&format!(r#"<itemref idref="ch{i}"/>"#));
    }
    let opf = format!(
        r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <metadata>
    <dc:title>Benchmark Book</dc:title>
    <dc:creator>Someone</dc:creator>
    <dc:description>&lt;p&gt;A &lt;b&gt;long&lt;/b&gt; description&lt;/p&gt;</dc:description>
  </metadata>
  <manifest>{manifest}</manifest>
  <spine>{spine}</spine>
</package>"#
    );

    let mut output = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(Cursor::new(&mut output));
        let options = zip::write::FileOptions::default();
        writer.start_file("META-INF/container.xml", options).unwrap();
        writer.write_all(CONTAINER.as_bytes()).unwrap();
        writer.start_file("OEBPS/content.opf", options).unwrap();
        writer.write_all(opf.as_bytes()).unwrap();
        for i in 0..chapters {
            writer.start_file(format!("OEBPS/ch{i}.xhtml"), options).unwrap();
            writer.write_all(b"<html><body><p>text</p></body></html>").unwrap();
        }
        writer.finish().unwrap();
    }
    output
}

fn extraction_benchmark(c: &mut Criterion) {
    let extractor = EpubExtractor::new();
    let data = sample_epub(200);

    c.bench_function("epub_metadata_200_chapters", |b| {
        b.iter(|| {
            let meta = extractor
                .extract(&mut Cursor::new(data.as_slice()))
                .unwrap();
            std::hint::black_box(meta)
        })
    });
}

criterion_group!(benches, extraction_benchmark);
criterion_main!(benches);
