//! Application facade
//!
//! [`ReaderApp`] owns every stateful component and is what a host (the CLI,
//! or a UI layer) drives. There is no global "selected book": operations
//! take the identifier they act on.

use crate::config::{Config, ScanMode};
use crate::coordinator::{ScanCoordinator, ScanOutcome};
use crate::error::{BookreaderError, Result};
use crate::extractor::Extractors;
use crate::library::{LibraryStore, SqliteLibraryStore};
use crate::preferences::Preferences;
use crate::scanner::DeviceScanner;
use crate::source::{DocumentSource, FolderSource};
use crate::tracker::{group_history, ReadingTracker};
use crate::types::{Book, Folder, HistoryGroup, HistoryItem};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What the home screen should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HomeState {
    /// The last scan found no source it was allowed to read
    PermissionRequired,
    Content {
        books: Vec<Book>,
        continue_reading: Vec<Book>,
    },
}

/// The library engine behind a reader application
pub struct ReaderApp {
    config: Config,
    store: Arc<dyn LibraryStore>,
    preferences: Arc<Preferences>,
    tracker: ReadingTracker,
    coordinator: ScanCoordinator,
    permission_required: AtomicBool,
}

impl ReaderApp {
    /// Open the library and preferences under `config.data_dir`
    pub async fn open(config: Config) -> Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir).await?;

        let store = SqliteLibraryStore::open(&config.database_path).await?;
        let preferences = Preferences::load(&config.preferences_path).await?;

        tracing::debug!(data_dir = %config.data_dir.display(), "Opened reader app");

        Ok(Self::with_parts(
            config,
            Arc::new(store),
            Arc::new(preferences),
            Extractors::default(),
        ))
    }

    /// Assemble an app from already opened parts
    pub fn with_parts(
        config: Config,
        store: Arc<dyn LibraryStore>,
        preferences: Arc<Preferences>,
        extractors: Extractors,
    ) -> Self {
        let scanner = DeviceScanner::new(extractors, config.jobs);
        Self {
            tracker: ReadingTracker::new(preferences.clone()),
            coordinator: ScanCoordinator::new(scanner, store.clone()),
            config,
            store,
            preferences,
            permission_required: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn preferences(&self) -> &Arc<Preferences> {
        &self.preferences
    }

    pub fn tracker(&self) -> &ReadingTracker {
        &self.tracker
    }

    pub fn is_scanning(&self) -> bool {
        self.coordinator.is_running()
    }

    // Scanning

    /// Sources for the configured scan mode
    pub async fn sources(&self) -> Vec<Arc<dyn DocumentSource>> {
        match &self.config.scan_mode {
            ScanMode::Index(root) => vec![Arc::new(FolderSource::new(root.clone()))],
            ScanMode::Folders => self
                .folders()
                .await
                .into_iter()
                .filter_map(|folder| match folder.local_path() {
                    Some(path) => Some(Arc::new(FolderSource::new(path)) as Arc<dyn DocumentSource>),
                    None => {
                        tracing::warn!(uri = %folder.uri, "Folder is not reachable from this host");
                        None
                    }
                })
                .collect(),
        }
    }

    /// Scan the configured sources and reconcile the library
    pub async fn scan(&self, cancel: CancellationToken) -> Result<ScanOutcome> {
        let sources = self.sources().await;
        self.scan_sources(sources, cancel).await
    }

    /// Scan explicit sources and reconcile the library
    pub async fn scan_sources(
        &self,
        sources: Vec<Arc<dyn DocumentSource>>,
        cancel: CancellationToken,
    ) -> Result<ScanOutcome> {
        let outcome = self.coordinator.request_scan(sources, cancel).await?;

        match &outcome {
            ScanOutcome::Completed(summary) => {
                self.permission_required.store(false, Ordering::Release);
                self.preferences
                    .record_scan(Utc::now(), summary.identifiers.clone())
                    .await?;
                if summary.sync.deleted > 0 {
                    let known: HashSet<String> = summary.identifiers.iter().cloned().collect();
                    let dropped = self.tracker.prune(&known).await?;
                    tracing::debug!(dropped, "Pruned reading references to removed books");
                }
            }
            ScanOutcome::PermissionRequired => {
                self.permission_required.store(true, Ordering::Release);
            }
            ScanOutcome::AlreadyRunning | ScanOutcome::Cancelled => {}
        }

        Ok(outcome)
    }

    pub async fn last_scan_time(&self) -> Option<DateTime<Utc>> {
        self.preferences.last_scan_time().await
    }

    // Library

    pub async fn books(&self) -> Result<Vec<Book>> {
        Ok(self.store.all_books().await?)
    }

    pub async fn book(&self, id: &str) -> Result<Book> {
        self.store
            .get_book(id)
            .await?
            .ok_or_else(|| BookreaderError::BookNotFound(id.to_string()))
    }

    /// Look up a book and record that it was opened
    pub async fn open_book(&self, id: &str) -> Result<Book> {
        let book = self.book(id).await?;
        self.tracker.mark_opened(id).await?;
        Ok(book)
    }

    /// Save the reading position.
    ///
    /// Reaching the total extent takes the book off continue reading.
    pub async fn update_progress(&self, id: &str, current: i64) -> Result<Book> {
        let current = current.max(0);
        if !self.store.update_progress(id, current).await? {
            return Err(BookreaderError::BookNotFound(id.to_string()));
        }

        let book = self.book(id).await?;
        if book.is_finished() && self.tracker.remove_from_continue_reading(id).await? {
            tracing::debug!(id, "Finished book removed from continue reading");
        }
        Ok(book)
    }

    /// Record the total extent once a viewer knows it
    pub async fn set_total(&self, id: &str, total: i64) -> Result<Book> {
        if !self.store.set_total(id, total.max(0)).await? {
            return Err(BookreaderError::BookNotFound(id.to_string()));
        }
        self.book(id).await
    }

    // Reading state

    pub async fn continue_reading(&self) -> Result<Vec<Book>> {
        let books = self.books().await?;
        Ok(self.tracker.continue_reading(&books).await)
    }

    pub async fn history(&self) -> Result<Vec<HistoryItem>> {
        let books = self.books().await?;
        Ok(self.tracker.history(&books).await)
    }

    pub async fn grouped_history<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<Vec<HistoryGroup>> {
        let items = self.history().await?;
        Ok(group_history(&items, now))
    }

    // Folders

    pub async fn folders(&self) -> Vec<Folder> {
        self.preferences
            .folders()
            .await
            .iter()
            .map(|uri| Folder::from_uri(uri))
            .collect()
    }

    /// Returns false if the folder was already saved
    pub async fn add_folder(&self, uri: &str) -> Result<bool> {
        Ok(self.preferences.add_folder(uri).await?)
    }

    /// Returns false if the folder was not saved
    pub async fn remove_folder(&self, uri: &str) -> Result<bool> {
        Ok(self.preferences.remove_folder(uri).await?)
    }

    // Goal and launch state

    pub async fn goal(&self) -> u32 {
        self.preferences.goal().await
    }

    pub async fn set_goal(&self, goal: u32) -> Result<()> {
        Ok(self.preferences.set_goal(goal).await?)
    }

    pub async fn is_first_launch(&self) -> bool {
        self.preferences.is_first_launch().await
    }

    pub async fn mark_first_launch_done(&self) -> Result<()> {
        Ok(self.preferences.set_first_launch_done().await?)
    }

    pub async fn home_state(&self) -> Result<HomeState> {
        if self.permission_required.load(Ordering::Acquire) {
            return Ok(HomeState::PermissionRequired);
        }
        let books = self.books().await?;
        let continue_reading = self.tracker.continue_reading(&books).await;
        Ok(HomeState::Content {
            books,
            continue_reading,
        })
    }
}
