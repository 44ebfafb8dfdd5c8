//! Error types for Bookreader Core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using BookreaderError
pub type Result<T> = std::result::Result<T, BookreaderError>;

/// Top-level error type for all Bookreader operations
#[derive(Debug, Error)]
pub enum BookreaderError {
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Preferences error: {0}")]
    Preferences(#[from] PreferencesError),

    #[error("Book not found: {0}")]
    BookNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors that occur while reading metadata out of a document
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    #[error("Missing archive entry: {0}")]
    MissingEntry(String),

    #[error("Archive entry {name} is larger than {limit} bytes")]
    EntryTooLarge { name: String, limit: u64 },

    #[error("Invalid XML in {path}: {message}")]
    InvalidXml { path: String, message: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Undecodable image: {0}")]
    InvalidImage(String),

    #[error("Failed to read document: {0}")]
    Read(#[from] std::io::Error),
}

/// Errors that occur while enumerating or reading documents
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Path outside of source root: {0}")]
    OutsideRoot(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl SourceError {
    /// Classify an IO error raised for `path`.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => {
                Self::PermissionDenied(path.display().to_string())
            }
            _ => Self::Io { path, source },
        }
    }
}

/// Errors raised by the library database
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to open database at {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    #[error("Database migration failed: {0}")]
    Migration(#[from] rusqlite::Error),

    #[error("Database query failed: {0}")]
    Query(String),

    #[error("Failed to spawn blocking task: {0}")]
    Spawn(#[from] tokio::task::JoinError),

    #[error("Database schema version {found} is newer than supported version {expected}")]
    UnsupportedSchemaVersion { found: i32, expected: i32 },
}

impl StoreError {
    /// Create a Query error from a rusqlite error.
    pub fn query(source: rusqlite::Error) -> Self {
        Self::Query(source.to_string())
    }
}

/// Errors raised while loading or saving preferences
#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed preferences file: {0}")]
    Malformed(#[from] serde_json::Error),
}
