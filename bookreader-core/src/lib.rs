//! Bookreader Core Library
//!
//! This crate is the library engine behind a book reader: it scans a device
//! for PDF and EPUB documents, extracts their metadata and covers, keeps a
//! local library in sync with what is on the device, and tracks reading
//! progress, continue-reading and history state.

pub mod app;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod extractor;
pub mod library;
pub mod preferences;
pub mod scanner;
pub mod source;
pub mod tracker;
pub mod types;

pub use app::{HomeState, ReaderApp};
pub use config::{Config, ScanMode};
pub use coordinator::{ScanCoordinator, ScanOutcome, ScanSummary};
pub use error::{BookreaderError, ExtractError, PreferencesError, Result, SourceError, StoreError};
pub use scanner::{DeviceScanner, ScanResult};
pub use types::{Book, BookFormat, BookMeta, Folder, HistoryEntry, HistoryGroup, HistoryItem};
