//! Single-flight scan coordination
//!
//! Runs the scanner off the async runtime and reconciles the library with
//! its result. Only one scan runs at a time; a second request while one is
//! in flight is turned away rather than queued.

use crate::error::Result;
use crate::library::{LibraryStore, SyncPlan, SyncReport};
use crate::scanner::DeviceScanner;
use crate::source::DocumentSource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Totals for a completed scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Books found on the device
    pub found: usize,
    pub degraded: usize,
    pub unreadable: usize,
    /// Sources that refused access while others granted it
    pub denied_sources: Vec<String>,
    pub sync: SyncReport,
    /// Identifiers of every book found
    pub identifiers: Vec<String>,
}

/// How a scan request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The library now matches the device
    Completed(ScanSummary),
    /// Another scan was in flight; nothing was done
    AlreadyRunning,
    /// Cancelled before finishing; the library was not touched
    Cancelled,
    /// No source granted access; the library was not touched
    PermissionRequired,
}

/// Serializes scans against one library store
pub struct ScanCoordinator {
    scanner: Arc<DeviceScanner>,
    store: Arc<dyn LibraryStore>,
    running: AtomicBool,
}

/// Clears the running flag when a scan ends, however it ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ScanCoordinator {
    pub fn new(scanner: DeviceScanner, store: Arc<dyn LibraryStore>) -> Self {
        Self {
            scanner: Arc::new(scanner),
            store,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Scan `sources` and reconcile the store with what was found.
    pub async fn request_scan(
        &self,
        sources: Vec<Arc<dyn DocumentSource>>,
        cancel: CancellationToken,
    ) -> Result<ScanOutcome> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Scan already in flight");
            return Ok(ScanOutcome::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.running);

        let scanner = self.scanner.clone();
        let token = cancel.clone();
        let result = tokio::task::spawn_blocking(move || scanner.scan(&sources, &token)).await?;

        if result.cancelled || cancel.is_cancelled() {
            tracing::info!("Scan cancelled, discarding results");
            return Ok(ScanOutcome::Cancelled);
        }

        if result.permission_required() {
            tracing::info!("No source granted access");
            return Ok(ScanOutcome::PermissionRequired);
        }

        let mut identifiers: Vec<String> = result.books.iter().map(|b| b.id.clone()).collect();
        identifiers.sort();

        let existing = self.store.identifiers().await?;
        let plan = SyncPlan::compute(&existing, result.books);
        let sync = self.store.apply_sync(plan).await?;

        tracing::info!(
            found = identifiers.len(),
            inserted = sync.inserted,
            deleted = sync.deleted,
            unchanged = sync.unchanged,
            "Library reconciled"
        );

        Ok(ScanOutcome::Completed(ScanSummary {
            found: identifiers.len(),
            degraded: result.degraded,
            unreadable: result.unreadable,
            denied_sources: result.denied_sources,
            sync,
            identifiers,
        }))
    }
}
