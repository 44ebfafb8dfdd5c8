//! Local folder source

use super::{DocumentEntry, DocumentSource, SourceResult};
use crate::error::SourceError;
use crate::types::BookFormat;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Directory levels below the root that are still walked
const DEFAULT_MAX_DEPTH: usize = 16;

/// Recursively enumerates PDF and EPUB files under a folder root
pub struct FolderSource {
    root: PathBuf,
    max_depth: usize,
}

impl FolderSource {
    /// Create a new folder source with the given root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn canonical_root(&self) -> SourceResult<PathBuf> {
        std::fs::canonicalize(&self.root).map_err(|e| SourceError::from_io(&self.root, e))
    }

    /// Resolve an entry to a path, refusing anything outside the root
    fn entry_path(&self, entry: &DocumentEntry) -> SourceResult<PathBuf> {
        let root = self.canonical_root()?;
        let path = std::fs::canonicalize(&entry.id).map_err(|e| SourceError::from_io(&entry.id, e))?;
        if !path.starts_with(&root) {
            return Err(SourceError::OutsideRoot(entry.id.clone()));
        }
        Ok(path)
    }

    fn walk(&self, dir: &Path, depth: usize, entries: &mut Vec<DocumentEntry>) {
        let read_dir = match std::fs::read_dir(dir) {
            Ok(read_dir) => read_dir,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                return;
            }
        };

        for dir_entry in read_dir.flatten() {
            let name = dir_entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            let Ok(file_type) = dir_entry.file_type() else {
                continue;
            };
            let path = dir_entry.path();

            if file_type.is_dir() {
                if depth < self.max_depth {
                    self.walk(&path, depth + 1, entries);
                }
            } else if file_type.is_file() {
                if let Some(format) = BookFormat::from_file_name(&name) {
                    let added_at = dir_entry
                        .metadata()
                        .and_then(|m| m.modified())
                        .ok()
                        .map(DateTime::<Utc>::from);
                    let mut entry =
                        DocumentEntry::new(path.to_string_lossy().into_owned(), name, format);
                    entry.added_at = added_at;
                    entries.push(entry);
                }
            }
        }
    }
}

impl DocumentSource for FolderSource {
    fn name(&self) -> String {
        format!("folder {}", self.root.display())
    }

    fn list(&self) -> SourceResult<Vec<DocumentEntry>> {
        let root = self.canonical_root()?;
        // Listing the root itself surfaces a revoked permission as an error
        std::fs::read_dir(&root).map_err(|e| SourceError::from_io(&root, e))?;

        let mut entries = Vec::new();
        self.walk(&root, 0, &mut entries);
        Ok(entries)
    }

    fn read(&self, entry: &DocumentEntry) -> SourceResult<Vec<u8>> {
        let path = self.entry_path(entry)?;
        std::fs::read(&path).map_err(|e| SourceError::from_io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lists_allowlisted_files_recursively() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("sci/fi")).unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"pdf").unwrap();
        std::fs::write(dir.path().join("sci/fi/b.EPUB"), b"epub").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"txt").unwrap();
        std::fs::create_dir_all(dir.path().join(".hidden")).unwrap();
        std::fs::write(dir.path().join(".hidden/c.pdf"), b"pdf").unwrap();

        let source = FolderSource::new(dir.path());
        let mut entries = source.list().unwrap();
        entries.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        let names: Vec<_> = entries.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.EPUB"]);
        assert_eq!(entries[1].format, BookFormat::Epub);
        assert!(entries.iter().all(|e| Path::new(&e.id).is_absolute()));
        assert!(entries.iter().all(|e| e.added_at.is_some()));

        assert_eq!(source.read(&entries[0]).unwrap(), b"pdf");
    }

    #[test]
    fn test_max_depth() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("deep")).unwrap();
        std::fs::write(dir.path().join("deep/a.pdf"), b"pdf").unwrap();

        let source = FolderSource::new(dir.path()).with_max_depth(0);
        assert!(source.list().unwrap().is_empty());
    }

    #[test]
    fn test_missing_root() {
        let source = FolderSource::new("/definitely/not/here");
        assert!(matches!(source.list(), Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_read_outside_root_is_refused() {
        let root = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let outside = other.path().join("x.pdf");
        std::fs::write(&outside, b"pdf").unwrap();

        let source = FolderSource::new(root.path());
        let entry = DocumentEntry::new(outside.to_string_lossy(), "x.pdf", BookFormat::Pdf);
        assert!(matches!(source.read(&entry), Err(SourceError::OutsideRoot(_))));
    }
}
