//! In-memory library store

use super::{LibraryStore, SyncPlan, SyncReport};
use crate::error::StoreError;
use crate::types::Book;
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Library store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryLibraryStore {
    books: RwLock<Vec<Book>>,
}

impl MemoryLibraryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LibraryStore for MemoryLibraryStore {
    async fn all_books(&self) -> Result<Vec<Book>, StoreError> {
        Ok(self.books.read().await.clone())
    }

    async fn get_book(&self, id: &str) -> Result<Option<Book>, StoreError> {
        Ok(self.books.read().await.iter().find(|b| b.id == id).cloned())
    }

    async fn identifiers(&self) -> Result<HashSet<String>, StoreError> {
        Ok(self.books.read().await.iter().map(|b| b.id.clone()).collect())
    }

    async fn apply_sync(&self, plan: SyncPlan) -> Result<SyncReport, StoreError> {
        let mut books = self.books.write().await;

        let delete: HashSet<&str> = plan.delete.iter().map(String::as_str).collect();
        let mut deleted_ids = Vec::new();
        let mut next: Vec<Book> = Vec::with_capacity(books.len() + plan.insert.len());
        for book in books.drain(..) {
            if delete.contains(book.id.as_str()) {
                deleted_ids.push(book.id);
            } else {
                next.push(book);
            }
        }
        deleted_ids.sort();

        let mut inserted = 0;
        let mut already_present = 0;
        for book in plan.insert {
            if next.iter().any(|b| b.id == book.id) {
                already_present += 1;
            } else {
                next.push(book);
                inserted += 1;
            }
        }
        *books = next;

        Ok(SyncReport {
            inserted,
            deleted: deleted_ids.len(),
            unchanged: plan.unchanged + already_present,
            deleted_ids,
        })
    }

    async fn update_progress(&self, id: &str, current: i64) -> Result<bool, StoreError> {
        let mut books = self.books.write().await;
        match books.iter_mut().find(|b| b.id == id) {
            Some(book) => {
                book.current_read = current;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_total(&self, id: &str, total: i64) -> Result<bool, StoreError> {
        let mut books = self.books.write().await;
        match books.iter_mut().find(|b| b.id == id) {
            Some(book) => {
                book.total_read = total;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_missing(&self, keep: &HashSet<String>) -> Result<usize, StoreError> {
        let mut books = self.books.write().await;
        let before = books.len();
        books.retain(|b| keep.contains(&b.id));
        Ok(before - books.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BookFormat;

    fn book(id: &str) -> Book {
        Book::from_file_name(id, &format!("{}.pdf", id), BookFormat::Pdf)
    }

    #[tokio::test]
    async fn test_reconcile_keeps_progress() {
        let store = MemoryLibraryStore::new();
        let existing = store.identifiers().await.unwrap();
        store
            .apply_sync(SyncPlan::compute(&existing, vec![book("a"), book("b")]))
            .await
            .unwrap();
        store.update_progress("a", 7).await.unwrap();

        let existing = store.identifiers().await.unwrap();
        let report = store
            .apply_sync(SyncPlan::compute(&existing, vec![book("a"), book("c")]))
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.deleted_ids, vec!["b".to_string()]);
        assert_eq!(report.unchanged, 1);

        let ids: Vec<_> = store
            .all_books()
            .await
            .unwrap()
            .into_iter()
            .map(|b| (b.id, b.current_read))
            .collect();
        assert_eq!(ids, vec![("a".to_string(), 7), ("c".to_string(), 0)]);
    }

    #[tokio::test]
    async fn test_unknown_book_progress() {
        let store = MemoryLibraryStore::new();
        assert!(!store.update_progress("nope", 1).await.unwrap());
        assert!(!store.set_total("nope", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_never_overwrites_existing_book() {
        let store = MemoryLibraryStore::new();
        let existing = store.identifiers().await.unwrap();
        store
            .apply_sync(SyncPlan::compute(&existing, vec![book("a")]))
            .await
            .unwrap();
        store.update_progress("a", 4).await.unwrap();

        let report = store
            .apply_sync(SyncPlan::compute(&existing, vec![book("a")]))
            .await
            .unwrap();

        assert_eq!(report.inserted, 0);
        assert_eq!(report.unchanged, 1);
        assert_eq!(store.get_book("a").await.unwrap().unwrap().current_read, 4);
    }
}
