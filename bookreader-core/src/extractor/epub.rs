//! EPUB metadata extractor
//!
//! Reads only what it needs out of the archive: the container descriptor,
//! the package document and, once resolved, the cover image entry.

use super::cover;
use crate::error::ExtractError;
use crate::types::{non_blank, BookFormat, BookMeta};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::io::{Cursor, Read};
use zip::result::ZipError;
use zip::ZipArchive;

/// Fixed location of the container descriptor
const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Covers larger than this are ignored
const DEFAULT_MAX_COVER_BYTES: u64 = 10 * 1024 * 1024;

/// Container descriptors and package documents larger than this are rejected
const DEFAULT_MAX_PACKAGE_BYTES: u64 = 4 * 1024 * 1024;

type Archive = ZipArchive<Cursor<Vec<u8>>>;

/// Extractor for EPUB 2/3 format
pub struct EpubExtractor {
    /// Upper bound on the size of a cover entry we are willing to read
    max_cover_bytes: u64,
    max_package_bytes: u64,
}

impl EpubExtractor {
    pub fn new() -> Self {
        Self {
            max_cover_bytes: DEFAULT_MAX_COVER_BYTES,
            max_package_bytes: DEFAULT_MAX_PACKAGE_BYTES,
        }
    }

    /// Set the maximum cover entry size
    pub fn with_max_cover_bytes(mut self, max: u64) -> Self {
        self.max_cover_bytes = max;
        self
    }

    /// Find the package document path via the container descriptor,
    /// falling back to the first `.opf` entry in the archive
    fn locate_package(&self, archive: &mut Archive) -> Result<String, ExtractError> {
        if let Some(container) = read_entry(archive, CONTAINER_PATH, self.max_package_bytes)? {
            let rootfile = parse_container(&container).map_err(|message| {
                ExtractError::InvalidXml {
                    path: CONTAINER_PATH.to_string(),
                    message,
                }
            })?;
            if let Some(path) = rootfile {
                return Ok(path);
            }
        }

        archive
            .file_names()
            .find(|name| name.to_lowercase().ends_with(".opf"))
            .map(|name| name.to_string())
            .ok_or_else(|| ExtractError::MissingEntry("package document".to_string()))
    }

    /// Try cover candidates in priority order; the first decodable image wins
    fn find_cover(&self, archive: &mut Archive, opf_path: &str, package: &Package) -> Option<Vec<u8>> {
        for item in package.cover_candidates() {
            let path = resolve_href(opf_path, &item.href);
            match read_entry(archive, &path, self.max_cover_bytes) {
                Ok(Some(bytes)) => {
                    if let Some(bytes) = cover::validate_cover(bytes) {
                        return Some(bytes);
                    }
                    tracing::debug!(entry = %path, "Cover candidate is not a decodable image");
                }
                Ok(None) => tracing::debug!(entry = %path, "Cover candidate missing from archive"),
                Err(e) => tracing::debug!(entry = %path, error = %e, "Failed to read cover candidate"),
            }
        }
        None
    }
}

impl Default for EpubExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Extractor for EpubExtractor {
    fn extract(&self, reader: &mut dyn Read) -> Result<BookMeta, ExtractError> {
        // Read all data into memory
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let mut archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| ExtractError::InvalidEpub(e.to_string()))?;

        let opf_path = self.locate_package(&mut archive)?;
        let opf = read_entry(&mut archive, &opf_path, self.max_package_bytes)?
            .ok_or_else(|| ExtractError::MissingEntry(opf_path.clone()))?;
        let package = parse_package(&opf).map_err(|message| ExtractError::InvalidXml {
            path: opf_path.clone(),
            message,
        })?;

        let mut meta = BookMeta::new();
        meta.title = package.title.clone();
        meta.author = package.creator.clone();
        meta.description = package.description.as_deref().and_then(clean_description);
        meta.extent = u32::try_from(package.spine_len).ok().filter(|n| *n > 0);
        meta.cover = self.find_cover(&mut archive, &opf_path, &package);

        Ok(meta)
    }

    fn format(&self) -> BookFormat {
        BookFormat::Epub
    }

    fn supported_extensions(&self) -> &[&str] {
        &["epub"]
    }

    fn supported_mime_types(&self) -> &[&str] {
        &["application/epub+zip"]
    }
}

/// Read an archive entry, matching its name case-insensitively when the
/// exact name is absent. Returns `None` for missing entries.
///
/// The size recorded in the archive is not trusted: at most `max_bytes + 1`
/// bytes are read before the entry is rejected as too large.
fn read_entry(archive: &mut Archive, name: &str, max_bytes: u64) -> Result<Option<Vec<u8>>, ExtractError> {
    let actual = if archive.file_names().any(|candidate| candidate == name) {
        name.to_string()
    } else {
        match archive
            .file_names()
            .find(|candidate| candidate.eq_ignore_ascii_case(name))
        {
            Some(found) => found.to_string(),
            None => return Ok(None),
        }
    };

    let file = match archive.by_name(&actual) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ExtractError::InvalidEpub(e.to_string())),
    };

    let too_large = || ExtractError::EntryTooLarge {
        name: actual.clone(),
        limit: max_bytes,
    };
    if file.size() > max_bytes {
        return Err(too_large());
    }

    let mut content = Vec::new();
    file.take(max_bytes.saturating_add(1))
        .read_to_end(&mut content)?;
    if content.len() as u64 > max_bytes {
        return Err(too_large());
    }
    Ok(Some(content))
}

/// A manifest entry of the package document
#[derive(Debug, Clone, PartialEq, Eq)]
struct ManifestItem {
    id: String,
    href: String,
    media_type: String,
    properties: Option<String>,
}

impl ManifestItem {
    fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_deref()
            .map(|p| p.split_whitespace().any(|p| p == property))
            .unwrap_or(false)
    }

    fn mentions_cover(&self) -> bool {
        self.id.to_lowercase().contains("cover") || self.href.to_lowercase().contains("cover")
    }
}

/// The parts of the package document we care about
#[derive(Debug, Default)]
struct Package {
    title: Option<String>,
    creator: Option<String>,
    description: Option<String>,
    /// Value of `<meta name="cover" content="...">`
    cover_meta: Option<String>,
    manifest: Vec<ManifestItem>,
    spine_len: usize,
}

impl Package {
    fn item_by_id(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    fn item_by_href(&self, href: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.href == href)
    }

    /// Cover candidates, most specific first, without duplicates
    fn cover_candidates(&self) -> Vec<&ManifestItem> {
        let mut candidates: Vec<&ManifestItem> = Vec::new();

        candidates.extend(self.manifest.iter().filter(|i| i.has_property("cover-image")));

        if let Some(cover) = &self.cover_meta {
            if let Some(item) = self.item_by_id(cover).or_else(|| self.item_by_href(cover)) {
                candidates.push(item);
            }
        }

        candidates.extend(
            self.manifest
                .iter()
                .filter(|i| i.is_image() && i.mentions_cover()),
        );
        candidates.extend(self.manifest.iter().filter(|i| i.is_image()));

        let mut seen = std::collections::HashSet::new();
        candidates.retain(|item| seen.insert(item.id.as_str()));
        candidates
    }
}

/// Dublin-Core fields we extract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DcField {
    Title,
    Creator,
    Description,
}

impl DcField {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(DcField::Title),
            b"creator" => Some(DcField::Creator),
            b"description" => Some(DcField::Description),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Metadata,
    Manifest,
    Spine,
}

/// Read an attribute by local name, unescaped
fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, String> {
    let mut attributes = element.attributes();
    attributes.with_checks(false);
    for attr in attributes {
        let attr = attr.map_err(|e| format!("Attribute error: {}", e))?;
        if attr.key.local_name().as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|e| format!("Attribute value error: {}", e))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Parse container.xml and return the package document path
fn parse_container(content: &[u8]) -> Result<Option<String>, String> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"rootfile" => {
                if let Some(path) = attribute(&e, b"full-path")?.and_then(|p| non_blank(&p)) {
                    return Ok(Some(path));
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => {
                return Err(format!(
                    "XML parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
        buf.clear();
    }
}

/// Parse the package document (OPF)
fn parse_package(content: &[u8]) -> Result<Package, String> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut package = Package::default();
    let mut section = Section::Other;
    let mut capture: Option<DcField> = None;
    let mut text = String::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            format!(
                "XML parse error at position {}: {}",
                reader.buffer_position(),
                e
            )
        })?;

        match event {
            Event::Start(e) => {
                let local = e.local_name();
                match local.as_ref() {
                    b"metadata" => section = Section::Metadata,
                    b"manifest" => section = Section::Manifest,
                    b"spine" => section = Section::Spine,
                    name if section == Section::Metadata && capture.is_none() => {
                        if let Some(field) = DcField::from_local_name(name) {
                            capture = Some(field);
                            text.clear();
                        } else {
                            handle_element(&mut package, section, &e)?;
                        }
                    }
                    _ => handle_element(&mut package, section, &e)?,
                }
            }
            Event::Empty(e) => handle_element(&mut package, section, &e)?,
            Event::Text(e) if capture.is_some() => {
                let value = e
                    .unescape()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(&value);
            }
            Event::CData(e) if capture.is_some() => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Event::End(e) => {
                let local = e.local_name();
                match local.as_ref() {
                    b"metadata" | b"manifest" | b"spine" => section = Section::Other,
                    name => {
                        if let Some(field) = capture {
                            if DcField::from_local_name(name) == Some(field) {
                                let slot = match field {
                                    DcField::Title => &mut package.title,
                                    DcField::Creator => &mut package.creator,
                                    DcField::Description => &mut package.description,
                                };
                                if slot.is_none() {
                                    *slot = non_blank(&text);
                                }
                                capture = None;
                            }
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(package)
}

/// Record `meta`, `item` and `itemref` elements
fn handle_element(package: &mut Package, section: Section, e: &BytesStart<'_>) -> Result<(), String> {
    match (section, e.local_name().as_ref()) {
        (Section::Metadata, b"meta") => {
            if attribute(e, b"name")?.as_deref() == Some("cover") {
                if let Some(content) = attribute(e, b"content")?.and_then(|c| non_blank(&c)) {
                    package.cover_meta = Some(content);
                }
            }
        }
        (Section::Manifest, b"item") => {
            let id = attribute(e, b"id")?.unwrap_or_default();
            let href = attribute(e, b"href")?.unwrap_or_default();
            if !href.is_empty() {
                package.manifest.push(ManifestItem {
                    id,
                    href,
                    media_type: attribute(e, b"media-type")?.unwrap_or_default(),
                    properties: attribute(e, b"properties")?,
                });
            }
        }
        (Section::Spine, b"itemref") => package.spine_len += 1,
        _ => {}
    }
    Ok(())
}

/// Resolve a manifest href against the package document's directory
fn resolve_href(opf_path: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);
    let href = urlencoding::decode(href)
        .map(|h| h.into_owned())
        .unwrap_or_else(|_| href.to_string());

    let base = opf_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    let mut segments: Vec<&str> = if href.starts_with('/') {
        Vec::new()
    } else {
        base.split('/').filter(|s| !s.is_empty()).collect()
    };

    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    segments.join("/")
}

/// Reduce a description that may carry HTML markup to plain text
fn clean_description(raw: &str) -> Option<String> {
    let text = if raw.contains('<') {
        let fragment = scraper::Html::parse_fragment(raw);
        fragment.root_element().text().collect::<Vec<_>>().join(" ")
    } else {
        raw.to_string()
    };
    non_blank(&text.split_whitespace().collect::<Vec<_>>().join(" "))
}
