//! Core types for the Bookreader library

mod book;
mod folder;
mod history;
mod meta;

pub use book::{
    title_from_file_name, Book, BookFormat, EPUB_MIME, NO_DESCRIPTION, PDF_MIME, UNKNOWN_AUTHOR,
};
pub use folder::Folder;
pub use history::{HistoryEntry, HistoryGroup, HistoryItem};
pub use meta::{non_blank, BookMeta};
