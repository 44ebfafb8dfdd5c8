//! SQLite library store.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::schema;
use super::{LibraryStore, SyncPlan, SyncReport};
use crate::error::StoreError;
use crate::types::{Book, BookFormat};

const SELECT_BOOK: &str = "SELECT id, title, author, description, cover, current_read, total_read, format FROM books";

/// SQLite implementation of the library store.
pub struct SqliteLibraryStore {
    /// rusqlite::Connection is not Sync
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteLibraryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLibraryStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteLibraryStore {
    /// Open or create a library database at the given path.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let path = path.to_path_buf();
        let path_clone = path.clone();

        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&path_clone).map_err(|e| StoreError::Open {
                path: path_clone.clone(),
                source: e,
            })?;

            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(StoreError::Migration)?;
            conn.pragma_update(None, "synchronous", "NORMAL")
                .map_err(StoreError::Migration)?;

            schema::migrate(&conn)?;

            Ok::<_, StoreError>(conn)
        })
        .await??;

        tracing::debug!(path = %path.display(), "Opened library database");

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Query(e.to_string()))
    }
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    let format: String = row.get(7)?;
    let format = format.parse::<BookFormat>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, e.into())
    })?;

    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        description: row.get(3)?,
        cover: row.get(4)?,
        current_read: row.get(5)?,
        total_read: row.get(6)?,
        format,
    })
}

#[async_trait]
impl LibraryStore for SqliteLibraryStore {
    async fn all_books(&self) -> Result<Vec<Book>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("{} ORDER BY rowid", SELECT_BOOK))
            .map_err(StoreError::query)?;
        let books = stmt
            .query_map([], book_from_row)
            .map_err(StoreError::query)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::query)?;
        Ok(books)
    }

    async fn get_book(&self, id: &str) -> Result<Option<Book>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("{} WHERE id = ?1", SELECT_BOOK),
            [id],
            book_from_row,
        )
        .optional()
        .map_err(StoreError::query)
    }

    async fn identifiers(&self) -> Result<HashSet<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id FROM books")
            .map_err(StoreError::query)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(StoreError::query)?
            .collect::<Result<HashSet<_>, _>>()
            .map_err(StoreError::query)?;
        Ok(ids)
    }

    async fn apply_sync(&self, plan: SyncPlan) -> Result<SyncReport, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(StoreError::query)?;

        let mut deleted_ids = Vec::with_capacity(plan.delete.len());
        let mut inserted = 0;
        {
            let mut delete = tx
                .prepare_cached("DELETE FROM books WHERE id = ?1")
                .map_err(StoreError::query)?;
            for id in &plan.delete {
                if delete.execute([id]).map_err(StoreError::query)? > 0 {
                    deleted_ids.push(id.clone());
                }
            }

            let mut insert = tx
                .prepare_cached(
                    r#"
                    INSERT OR IGNORE INTO books
                        (id, title, author, description, cover, current_read, total_read, format)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                )
                .map_err(StoreError::query)?;
            for book in &plan.insert {
                inserted += insert
                    .execute(params![
                        &book.id,
                        &book.title,
                        &book.author,
                        &book.description,
                        &book.cover,
                        book.current_read,
                        book.total_read,
                        book.format.extension(),
                    ])
                    .map_err(StoreError::query)?;
            }
        }

        tx.commit().map_err(StoreError::query)?;

        // Rows that already existed keep their reading progress
        Ok(SyncReport {
            inserted,
            deleted: deleted_ids.len(),
            unchanged: plan.unchanged + (plan.insert.len() - inserted),
            deleted_ids,
        })
    }

    async fn update_progress(&self, id: &str, current: i64) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE books SET current_read = ?1 WHERE id = ?2",
                params![current, id],
            )
            .map_err(StoreError::query)?;
        Ok(changed > 0)
    }

    async fn set_total(&self, id: &str, total: i64) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE books SET total_read = ?1 WHERE id = ?2",
                params![total, id],
            )
            .map_err(StoreError::query)?;
        Ok(changed > 0)
    }

    async fn delete_missing(&self, keep: &HashSet<String>) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(StoreError::query)?;

        let existing = {
            let mut stmt = tx
                .prepare("SELECT id FROM books")
                .map_err(StoreError::query)?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(StoreError::query)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(StoreError::query)?;
            ids
        };

        let mut deleted = 0;
        for id in existing.iter().filter(|id| !keep.contains(*id)) {
            deleted += tx
                .execute("DELETE FROM books WHERE id = ?1", [id])
                .map_err(StoreError::query)?;
        }

        tx.commit().map_err(StoreError::query)?;
        Ok(deleted)
    }
}
