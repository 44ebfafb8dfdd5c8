//! Document fixtures built in-test

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::io::{Cursor, Write};

const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// A small PNG
pub fn png() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 6, Rgb([10, 20, 30])));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Zip `entries` into an archive
pub fn zip(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut output = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(Cursor::new(&mut output));
        let stored = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        let deflated = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, data) in entries {
            let options = if *name == "mimetype" { stored } else { deflated };
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }
    output
}

/// An EPUB whose OPF carries `metadata` and `manifest` verbatim.
///
/// `files` are added under `OEBPS/`.
pub fn epub(metadata: &str, manifest: &str, files: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" xmlns:dc="http://purl.org/dc/elements/1.1/" version="3.0">
  <metadata>{}</metadata>
  <manifest>
    <item id="ch1" href="ch1.xhtml" media-type="application/xhtml+xml"/>
    {}
  </manifest>
  <spine><itemref idref="ch1"/></spine>
</package>"#,
        metadata, manifest
    );

    let mut entries: Vec<(String, Vec<u8>)> = vec![
        ("mimetype".to_string(), b"application/epub+zip".to_vec()),
        ("META-INF/container.xml".to_string(), CONTAINER.as_bytes().to_vec()),
        ("OEBPS/content.opf".to_string(), opf.into_bytes()),
        (
            "OEBPS/ch1.xhtml".to_string(),
            b"<html><body><p>Hello</p></body></html>".to_vec(),
        ),
    ];
    for (name, data) in files {
        entries.push((format!("OEBPS/{}", name), data.clone()));
    }

    let borrowed: Vec<(&str, Vec<u8>)> = entries
        .iter()
        .map(|(name, data)| (name.as_str(), data.clone()))
        .collect();
    zip(&borrowed)
}

/// Overwrite the uncompressed size the zip central directory records for `name`
pub fn claim_size(mut archive: Vec<u8>, name: &str, size: u32) -> Vec<u8> {
    let mut i = 0;
    while i + 46 <= archive.len() {
        if &archive[i..i + 4] == b"PK\x01\x02" {
            let name_len = u16::from_le_bytes([archive[i + 28], archive[i + 29]]) as usize;
            if archive.get(i + 46..i + 46 + name_len) == Some(name.as_bytes()) {
                archive[i + 24..i + 28].copy_from_slice(&size.to_le_bytes());
            }
        }
        i += 1;
    }
    archive
}

/// An EPUB with no metadata at all
pub fn bare_epub() -> Vec<u8> {
    epub("", "", &[])
}

/// A PDF with `pages` empty pages and the given Info strings
pub fn pdf(info: &[(&str, &str)], pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for _ in 0..pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"q Q".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if !info.is_empty() {
        let mut dict = Dictionary::new();
        for (key, value) in info {
            dict.set(*key, Object::string_literal(*value));
        }
        let info_id = doc.add_object(dict);
        doc.trailer.set("Info", info_id);
    }

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}
