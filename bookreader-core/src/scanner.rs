//! Device scanner
//!
//! Enumerates every configured source, reads each candidate document and
//! turns it into a [`Book`]. One bad file never fails the pass: extraction
//! errors degrade to file-name metadata, unreadable files are skipped.

use crate::error::SourceError;
use crate::extractor::{extract_or_fallback, Extractors};
use crate::source::{DocumentEntry, DocumentSource};
use crate::types::Book;
use rayon::prelude::*;
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Books and statistics from a single scanner pass
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Books found, most recently added first
    pub books: Vec<Book>,

    /// Files whose metadata could not be extracted
    pub degraded: usize,

    /// Files that were listed but could not be read
    pub unreadable: usize,

    /// Number of sources consulted
    pub source_count: usize,

    /// Sources that refused access
    pub denied_sources: Vec<String>,

    /// Sources that failed to list for any other reason
    pub failed_sources: Vec<String>,

    /// The pass was cancelled before it finished
    pub cancelled: bool,
}

impl ScanResult {
    /// Identifiers of every book found
    pub fn identifiers(&self) -> HashSet<String> {
        self.books.iter().map(|b| b.id.clone()).collect()
    }

    /// No source granted access. Also true when there were no sources at all.
    pub fn permission_required(&self) -> bool {
        self.denied_sources.len() == self.source_count
    }
}

/// Scans document sources into books
pub struct DeviceScanner {
    extractors: Extractors,
    jobs: usize,
}

impl DeviceScanner {
    pub fn new(extractors: Extractors, jobs: usize) -> Self {
        Self {
            extractors,
            jobs: jobs.max(1),
        }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Run one pass over `sources`.
    ///
    /// Blocking; callers on an async runtime go through `spawn_blocking`.
    pub fn scan(
        &self,
        sources: &[Arc<dyn DocumentSource>],
        cancel: &CancellationToken,
    ) -> ScanResult {
        let mut result = ScanResult {
            source_count: sources.len(),
            ..ScanResult::default()
        };

        let mut entries: Vec<(usize, DocumentEntry)> = Vec::new();
        for (index, source) in sources.iter().enumerate() {
            match source.list() {
                Ok(listed) => {
                    tracing::debug!(source = %source.name(), count = listed.len(), "Listed source");
                    entries.extend(listed.into_iter().map(|entry| (index, entry)));
                }
                Err(SourceError::PermissionDenied(what)) => {
                    tracing::warn!(source = %source.name(), "Permission denied for {}", what);
                    result.denied_sources.push(source.name());
                }
                Err(e) => {
                    tracing::warn!(source = %source.name(), error = %e, "Failed to list source");
                    result.failed_sources.push(source.name());
                }
            }
        }

        // Newest first; entries without a timestamp go last
        entries.sort_by(|(_, a), (_, b)| b.added_at.cmp(&a.added_at));
        let mut seen = HashSet::new();
        entries.retain(|(_, entry)| seen.insert(entry.id.clone()));

        let degraded = AtomicUsize::new(0);
        let unreadable = AtomicUsize::new(0);
        let process = |(index, entry): &(usize, DocumentEntry)| -> Option<Book> {
            if cancel.is_cancelled() {
                return None;
            }
            self.scan_entry(sources[*index].as_ref(), entry, &degraded, &unreadable)
        };

        result.books = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
        {
            Ok(pool) => pool.install(|| entries.par_iter().filter_map(process).collect::<Vec<_>>()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build scan pool, scanning sequentially");
                entries.iter().filter_map(process).collect::<Vec<_>>()
            }
        };

        result.degraded = degraded.load(Ordering::Relaxed);
        result.unreadable = unreadable.load(Ordering::Relaxed);
        result.cancelled = cancel.is_cancelled();

        tracing::info!(
            books = result.books.len(),
            degraded = result.degraded,
            unreadable = result.unreadable,
            denied = result.denied_sources.len(),
            cancelled = result.cancelled,
            "Scan pass finished"
        );

        result
    }

    fn scan_entry(
        &self,
        source: &dyn DocumentSource,
        entry: &DocumentEntry,
        degraded: &AtomicUsize,
        unreadable: &AtomicUsize,
    ) -> Option<Book> {
        let data = match source.read(entry) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(id = %entry.id, error = %e, "Skipping unreadable document");
                unreadable.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        let extracted = extract_or_fallback(
            self.extractors.for_format(entry.format),
            &entry.id,
            &entry.display_name,
            &mut Cursor::new(data),
        );
        if extracted.degraded {
            degraded.fetch_add(1, Ordering::Relaxed);
        }
        Some(extracted.book)
    }
}

impl Default for DeviceScanner {
    fn default() -> Self {
        let jobs = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(Extractors::default(), jobs)
    }
}
