//! In-memory source
//!
//! Plays the role of a platform content index: documents are registered with
//! their identifier, display name and MIME type, and listing returns them as
//! the index would. Also backs the scanner tests.

use super::{is_allowed_mime, DocumentEntry, DocumentSource, SourceResult};
use crate::error::SourceError;
use crate::types::BookFormat;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Default)]
struct Inner {
    entries: HashMap<String, (DocumentEntry, Vec<u8>)>,
    denied: bool,
}

/// In-memory document index
#[derive(Default)]
pub struct MemorySource {
    name: String,
    inner: RwLock<Inner>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::default(),
        }
    }

    /// Register a document; the format is taken from its MIME type.
    ///
    /// MIME types outside the allowlist are ignored and `false` is returned.
    pub fn insert(
        &self,
        id: impl Into<String>,
        display_name: impl Into<String>,
        mime: &str,
        added_at: DateTime<Utc>,
        data: Vec<u8>,
    ) -> bool {
        if !is_allowed_mime(mime) {
            return false;
        }
        let Some(format) = BookFormat::from_mime_type(mime) else {
            return false;
        };
        let entry = DocumentEntry::new(id, display_name, format).with_added_at(added_at);
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .insert(entry.id.clone(), (entry, data));
        true
    }

    /// Remove a document, as if it was deleted from the device
    pub fn remove(&self, id: &str) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .remove(id)
            .is_some()
    }

    /// Simulate a revoked (or never granted) read permission
    pub fn set_denied(&self, denied: bool) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .denied = denied;
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentSource for MemorySource {
    fn name(&self) -> String {
        format!("index {}", self.name)
    }

    fn list(&self) -> SourceResult<Vec<DocumentEntry>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        if inner.denied {
            return Err(SourceError::PermissionDenied(self.name.clone()));
        }
        Ok(inner.entries.values().map(|(entry, _)| entry.clone()).collect())
    }

    fn read(&self, entry: &DocumentEntry) -> SourceResult<Vec<u8>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        if inner.denied {
            return Err(SourceError::PermissionDenied(self.name.clone()));
        }
        inner
            .entries
            .get(&entry.id)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| SourceError::NotFound(entry.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EPUB_MIME, PDF_MIME};

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new("test");
        let now = Utc::now();

        assert!(source.insert("content://1", "a.pdf", PDF_MIME, now, b"pdf".to_vec()));
        assert!(!source.insert("content://2", "a.txt", "text/plain", now, b"txt".to_vec()));
        assert_eq!(source.len(), 1);

        let entries = source.list().unwrap();
        assert_eq!(entries[0].format, BookFormat::Pdf);
        assert_eq!(source.read(&entries[0]).unwrap(), b"pdf");

        assert!(source.remove("content://1"));
        assert!(source.is_empty());
        assert!(matches!(source.read(&entries[0]), Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_denied() {
        let source = MemorySource::new("test");
        source.set_denied(true);
        assert!(matches!(source.list(), Err(SourceError::PermissionDenied(_))));
    }

    #[test]
    fn test_format_follows_mime_not_name() {
        let source = MemorySource::new("test");
        let now = Utc::now();

        assert!(source.insert("content://media/external/file/42", "Dune", PDF_MIME, now, Vec::new()));
        assert!(source.insert("content://media/external/file/43", "notes.pdf", EPUB_MIME, now, Vec::new()));
        assert!(!source.insert("content://media/external/file/44", "story.epub", "application/x-mobipocket-ebook", now, Vec::new()));

        let mut entries = source.list().unwrap();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].display_name, "Dune");
        assert_eq!(entries[0].format, BookFormat::Pdf);
        assert_eq!(entries[1].format, BookFormat::Epub);
    }
}
