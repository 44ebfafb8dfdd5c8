//! Document sources the scanner enumerates
//!
//! A source is anything that can list candidate documents and hand out their
//! bytes: a folder on disk, or a platform content index queried by MIME type.

mod folder;
mod memory;

pub use folder::FolderSource;
pub use memory::MemorySource;

use crate::error::SourceError;
use crate::types::{BookFormat, EPUB_MIME, PDF_MIME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result type for source operations
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// MIME types the scanner accepts
pub const MIME_ALLOWLIST: [&str; 2] = [PDF_MIME, EPUB_MIME];

/// Whether a MIME type is on the scan allowlist
pub fn is_allowed_mime(mime: &str) -> bool {
    MIME_ALLOWLIST.contains(&mime)
}

/// A candidate document reported by a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    /// Stable document identifier
    pub id: String,

    /// File name shown to the user, extension included
    pub display_name: String,

    /// Document format
    pub format: BookFormat,

    /// When the document appeared on the device, if known
    pub added_at: Option<DateTime<Utc>>,
}

impl DocumentEntry {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, format: BookFormat) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            format,
            added_at: None,
        }
    }

    pub fn with_added_at(mut self, added_at: DateTime<Utc>) -> Self {
        self.added_at = Some(added_at);
        self
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Something the scanner can enumerate documents from
pub trait DocumentSource: Send + Sync {
    /// Short description for logs
    fn name(&self) -> String;

    /// List every allowlisted document
    fn list(&self) -> SourceResult<Vec<DocumentEntry>>;

    /// Read a document's bytes
    fn read(&self, entry: &DocumentEntry) -> SourceResult<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowlist() {
        assert!(is_allowed_mime("application/pdf"));
        assert!(is_allowed_mime("application/epub+zip"));
        assert!(!is_allowed_mime("application/x-mobipocket-ebook"));
    }

    #[test]
    fn test_entry_mime() {
        let entry = DocumentEntry::new("/a/b.epub", "b.epub", BookFormat::Epub);
        assert_eq!(entry.mime_type(), "application/epub+zip");
        assert_eq!(entry.added_at, None);
    }
}
