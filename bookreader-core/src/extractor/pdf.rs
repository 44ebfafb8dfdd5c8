//! PDF metadata extractor
//!
//! Title, author and subject come from the document information dictionary.
//! The cover is whatever a [`PageRenderer`] makes of the first page; the
//! built-in [`EmbeddedImageRenderer`] uses the largest image drawn on it,
//! which covers scanned books and most publisher PDFs.

use super::cover;
use crate::error::ExtractError;
use crate::types::{non_blank, BookFormat, BookMeta};
use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Read;
use std::sync::Arc;

/// Renders the first page of a PDF to encoded image bytes
pub trait PageRenderer: Send + Sync {
    fn render_first_page(&self, data: &[u8], document: &Document) -> Result<Vec<u8>, ExtractError>;
}

/// Parent chains longer than this are treated as broken
const MAX_PAGE_TREE_DEPTH: usize = 32;

/// Uses the largest image XObject on the first page as its rendering
pub struct EmbeddedImageRenderer {
    /// Images smaller than this on either side are ignored (logos, bullets)
    min_dimension: u32,
}

impl EmbeddedImageRenderer {
    pub fn new() -> Self {
        Self { min_dimension: 16 }
    }

    /// Encode one image stream, or `None` when its encoding is unsupported
    fn encode(&self, stream: &Stream, info: &ImageInfo) -> Option<Vec<u8>> {
        match info.filters.as_slice() {
            [filter] if filter == b"DCTDecode" => cover::validate_cover(stream.content.clone()),
            [] => self.encode_raw(stream.content.clone(), info),
            [filter] if filter == b"FlateDecode" => {
                let raw = stream.decompressed_content().ok()?;
                self.encode_raw(raw, info)
            }
            _ => None,
        }
    }

    /// Wrap raw 8-bit samples into a PNG
    fn encode_raw(&self, mut raw: Vec<u8>, info: &ImageInfo) -> Option<Vec<u8>> {
        if info.bits_per_component != 8 {
            return None;
        }
        let expected = (info.width as usize)
            .checked_mul(info.height as usize)?
            .checked_mul(info.components)?;
        if raw.len() < expected {
            return None;
        }
        raw.truncate(expected);

        let image = match info.components {
            3 => DynamicImage::ImageRgb8(RgbImage::from_raw(info.width, info.height, raw)?),
            1 => DynamicImage::ImageLuma8(GrayImage::from_raw(info.width, info.height, raw)?),
            _ => return None,
        };
        cover::encode_png(&image).ok()
    }
}

impl Default for EmbeddedImageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRenderer for EmbeddedImageRenderer {
    fn render_first_page(&self, _data: &[u8], document: &Document) -> Result<Vec<u8>, ExtractError> {
        let page_id = document
            .get_pages()
            .into_values()
            .next()
            .ok_or_else(|| ExtractError::InvalidPdf("document has no pages".to_string()))?;

        let mut images: Vec<(&Stream, ImageInfo)> = page_images(document, page_id)
            .into_iter()
            .filter_map(|stream| image_info(document, stream).map(|info| (stream, info)))
            .filter(|(_, info)| {
                info.width >= self.min_dimension && info.height >= self.min_dimension
            })
            .collect();
        images.sort_by_key(|(_, info)| std::cmp::Reverse(info.area()));

        images
            .iter()
            .find_map(|(stream, info)| self.encode(stream, info))
            .ok_or_else(|| ExtractError::InvalidImage("no usable image on first page".to_string()))
    }
}

/// Extractor for PDF documents
pub struct PdfExtractor {
    renderer: Arc<dyn PageRenderer>,
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self {
            renderer: Arc::new(EmbeddedImageRenderer::new()),
        }
    }

    fn render_cover(&self, data: &[u8], document: &Document) -> Option<Vec<u8>> {
        match self.renderer.render_first_page(data, document) {
            Ok(bytes) => cover::validate_cover(bytes),
            Err(e) => {
                tracing::debug!(error = %e, "No cover rendered for PDF");
                None
            }
        }
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Extractor for PdfExtractor {
    fn extract(&self, reader: &mut dyn Read) -> Result<BookMeta, ExtractError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let document =
            Document::load_mem(&data).map_err(|e| ExtractError::InvalidPdf(e.to_string()))?;

        let mut meta = BookMeta::new();
        meta.extent = u32::try_from(document.get_pages().len())
            .ok()
            .filter(|n| *n > 0);

        // Strings of encrypted documents are ciphertext
        if document.trailer.get(b"Encrypt").is_ok() {
            return Ok(meta);
        }

        if let Some(info) = info_dictionary(&document) {
            meta.title = info_string(&document, info, b"Title");
            meta.author = info_string(&document, info, b"Author");
            meta.description = info_string(&document, info, b"Subject");
        }
        meta.cover = self.render_cover(&data, &document);

        Ok(meta)
    }

    fn format(&self) -> BookFormat {
        BookFormat::Pdf
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn supported_mime_types(&self) -> &[&str] {
        &["application/pdf"]
    }
}

/// Follow an indirect reference
fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(document, object)? {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn info_dictionary(document: &Document) -> Option<&Dictionary> {
    let info = document.trailer.get(b"Info").ok()?;
    resolve_dict(document, info)
}

fn info_string(document: &Document, info: &Dictionary, key: &[u8]) -> Option<String> {
    match resolve(document, info.get(key).ok()?)? {
        Object::String(bytes, _) => non_blank(&decode_text_string(bytes)),
        _ => None,
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, UTF-8 with BOM, or
/// PDFDocEncoding, which agrees with Latin-1 on printable characters)
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(rest).into_owned()
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Resources of a page, inherited from its ancestors when absent
fn page_resources(document: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        if let Some(resources) = node
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve_dict(document, r))
        {
            return Some(resources);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = document.get_dictionary(parent).ok()?;
    }
    None
}

/// Image XObject streams referenced by a page
fn page_images(document: &Document, page_id: ObjectId) -> Vec<&Stream> {
    let Some(xobjects) = page_resources(document, page_id)
        .and_then(|res| res.get(b"XObject").ok())
        .and_then(|x| resolve_dict(document, x))
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(_, object)| match resolve(document, object)? {
            Object::Stream(stream) => Some(stream),
            _ => None,
        })
        .filter(|stream| {
            matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name.as_slice() == b"Image")
        })
        .collect()
}

/// Geometry and encoding of an image XObject
#[derive(Debug)]
struct ImageInfo {
    width: u32,
    height: u32,
    components: usize,
    bits_per_component: i64,
    filters: Vec<Vec<u8>>,
}

impl ImageInfo {
    fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

fn integer(document: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match resolve(document, dict.get(key).ok()?)? {
        Object::Integer(value) => Some(*value),
        _ => None,
    }
}

fn image_info(document: &Document, stream: &Stream) -> Option<ImageInfo> {
    let dict = &stream.dict;
    let width = u32::try_from(integer(document, dict, b"Width")?).ok()?;
    let height = u32::try_from(integer(document, dict, b"Height")?).ok()?;

    let components = match dict.get(b"ColorSpace").ok().and_then(|c| resolve(document, c)) {
        Some(Object::Name(name)) if name.as_slice() == b"DeviceRGB" => 3,
        Some(Object::Name(name)) if name.as_slice() == b"DeviceGray" => 1,
        // JPEG data carries its own color model
        _ => 0,
    };

    let filters = match dict.get(b"Filter").ok().and_then(|f| resolve(document, f)) {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    Some(ImageInfo {
        width,
        height,
        components,
        bits_per_component: integer(document, dict, b"BitsPerComponent").unwrap_or(8),
        filters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Extractor;
    use lopdf::dictionary;
    use std::io::Cursor;

    /// Build a one-page PDF with optional info strings and a page image
    fn build_pdf(info: &[(&str, Object)], image: Option<Stream>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let content_id = doc.add_object(Stream::new(dictionary! {}, b"q Q".to_vec()));
        let mut resources = dictionary! {};
        if let Some(image) = image {
            let image_id = doc.add_object(image);
            resources.set("XObject", dictionary! { "Im1" => image_id });
        }
        let resources_id = doc.add_object(resources);

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if !info.is_empty() {
            let mut dict = Dictionary::new();
            for (key, value) in info {
                dict.set(*key, value.clone());
            }
            let info_id = doc.add_object(dict);
            doc.trailer.set("Info", info_id);
        }

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn rgb_image(width: i64, height: i64) -> Stream {
        let samples = vec![200u8; (width * height * 3) as usize];
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            samples,
        )
    }

    fn extract(data: Vec<u8>) -> BookMeta {
        PdfExtractor::new().extract(&mut Cursor::new(data)).unwrap()
    }

    #[test]
    fn test_decode_text_string() {
        assert_eq!(decode_text_string(b"Dune"), "Dune");
        assert_eq!(decode_text_string(&[0xFE, 0xFF, 0x00, 0x44, 0x00, 0xFC]), "Dü");
        assert_eq!(decode_text_string(&[0xE9]), "é");
    }

    #[test]
    fn test_info_dictionary() {
        let data = build_pdf(
            &[
                ("Title", Object::string_literal("Dune")),
                ("Author", Object::string_literal("Frank Herbert")),
                ("Subject", Object::string_literal("  ")),
            ],
            None,
        );
        let meta = extract(data);
        assert_eq!(meta.title.as_deref(), Some("Dune"));
        assert_eq!(meta.author.as_deref(), Some("Frank Herbert"));
        assert_eq!(meta.description, None);
        assert_eq!(meta.extent, Some(1));
        assert_eq!(meta.cover, None);
    }

    #[test]
    fn test_no_info_dictionary() {
        let meta = extract(build_pdf(&[], None));
        assert_eq!(meta.title, None);
        assert_eq!(meta.author, None);
    }

    #[test]
    fn test_cover_from_inherited_page_image() {
        let meta = extract(build_pdf(&[], Some(rgb_image(20, 30))));
        let cover = meta.cover.expect("cover should be rendered");
        assert!(cover.starts_with(b"\x89PNG"));
        let decoded = image::load_from_memory(&cover).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 30));
    }

    #[test]
    fn test_tiny_images_are_ignored() {
        let meta = extract(build_pdf(&[], Some(rgb_image(4, 4))));
        assert_eq!(meta.cover, None);
    }

    #[test]
    fn test_not_a_pdf() {
        let result = PdfExtractor::new().extract(&mut Cursor::new(b"%PDF-garbage".to_vec()));
        assert!(matches!(result, Err(ExtractError::InvalidPdf(_))));
    }
}
