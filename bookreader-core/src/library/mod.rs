//! Persistent book library
//!
//! The library is reconciled against each completed scan: identifiers found
//! for the first time are inserted, identifiers no longer found are deleted,
//! and books present on both sides are left alone so reading progress
//! survives rescans.

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryLibraryStore;
pub use sqlite::SqliteLibraryStore;

use crate::error::StoreError;
use crate::types::Book;
use async_trait::async_trait;
use std::collections::HashSet;

/// Trait for library storage backends.
///
/// Object-safe so the app can hold an `Arc<dyn LibraryStore>`.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Every book, in insertion order
    async fn all_books(&self) -> Result<Vec<Book>, StoreError>;

    /// A single book by identifier
    async fn get_book(&self, id: &str) -> Result<Option<Book>, StoreError>;

    /// Identifiers of every stored book
    async fn identifiers(&self) -> Result<HashSet<String>, StoreError>;

    /// Apply a reconciliation plan as a single atomic change
    async fn apply_sync(&self, plan: SyncPlan) -> Result<SyncReport, StoreError>;

    /// Set the current reading position. Returns false for unknown books.
    async fn update_progress(&self, id: &str, current: i64) -> Result<bool, StoreError>;

    /// Set the total reading extent. Returns false for unknown books.
    async fn set_total(&self, id: &str, total: i64) -> Result<bool, StoreError>;

    /// Delete every book whose identifier is not in `keep`
    async fn delete_missing(&self, keep: &HashSet<String>) -> Result<usize, StoreError>;
}

/// Changes needed to bring the store in line with a scan
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    /// Books seen for the first time
    pub insert: Vec<Book>,

    /// Identifiers no longer present on the device, sorted
    pub delete: Vec<String>,

    /// Books present on both sides
    pub unchanged: usize,
}

impl SyncPlan {
    /// Diff the stored identifiers against a scan's books.
    pub fn compute(existing: &HashSet<String>, scanned: Vec<Book>) -> Self {
        let scanned_ids: HashSet<&str> = scanned.iter().map(|b| b.id.as_str()).collect();

        let mut delete: Vec<String> = existing
            .iter()
            .filter(|id| !scanned_ids.contains(id.as_str()))
            .cloned()
            .collect();
        delete.sort();

        let mut unchanged = 0;
        let mut seen = HashSet::new();
        let mut insert = Vec::new();
        for book in scanned {
            if !seen.insert(book.id.clone()) {
                continue;
            }
            if existing.contains(&book.id) {
                unchanged += 1;
            } else {
                insert.push(book);
            }
        }

        Self {
            insert,
            delete,
            unchanged,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.delete.is_empty()
    }
}

/// What an applied plan changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub inserted: usize,
    pub deleted: usize,
    pub unchanged: usize,

    /// Identifiers removed from the library
    pub deleted_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BookFormat;

    fn book(id: &str) -> Book {
        Book::from_file_name(id, &format!("{}.pdf", id), BookFormat::Pdf)
    }

    #[test]
    fn test_compute_plan() {
        let existing: HashSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let plan = SyncPlan::compute(&existing, vec![book("b"), book("d"), book("a")]);

        let inserted: Vec<_> = plan.insert.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(inserted, vec!["d"]);
        assert_eq!(plan.delete, vec!["c".to_string()]);
        assert_eq!(plan.unchanged, 2);
        assert!(!plan.is_empty());
    }

    #[test]
    fn test_identical_scan_is_empty_plan() {
        let existing: HashSet<String> = ["a"].iter().map(|s| s.to_string()).collect();
        let plan = SyncPlan::compute(&existing, vec![book("a")]);
        assert!(plan.is_empty());
        assert_eq!(plan.unchanged, 1);
    }

    #[test]
    fn test_empty_scan_deletes_everything() {
        let existing: HashSet<String> = ["b", "a"].iter().map(|s| s.to_string()).collect();
        let plan = SyncPlan::compute(&existing, Vec::new());
        assert_eq!(plan.delete, vec!["a".to_string(), "b".to_string()]);
    }
}
