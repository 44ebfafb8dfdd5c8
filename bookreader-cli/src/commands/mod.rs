//! CLI command implementations

mod info;
mod library;
mod reading;
mod scan;
mod settings;

pub use info::info;
pub use library::{list, open, progress};
pub use reading::{continue_reading, history};
pub use scan::scan;
pub use settings::{folders_add, folders_list, folders_remove, goal};

use bookreader_core::Book;
use serde::Serialize;

/// A book as printed by the CLI; cover bytes are summarized
#[derive(Serialize)]
pub(crate) struct BookRow {
    id: String,
    title: String,
    author: String,
    description: String,
    format: String,
    current_read: i64,
    total_read: i64,
    cover_bytes: Option<usize>,
}

impl From<&Book> for BookRow {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            description: book.description.clone(),
            format: book.format.to_string(),
            current_read: book.current_read,
            total_read: book.total_read,
            cover_bytes: book.cover.as_ref().map(Vec::len),
        }
    }
}

/// One-line summary: title, author, progress
pub(crate) fn book_line(book: &Book) -> String {
    let progress = if book.total_read > 0 {
        format!("{}/{}", book.current_read, book.total_read)
    } else {
        book.current_read.to_string()
    };
    format!("{} - {} [{}] ({})", book.title, book.author, book.format, progress)
}
