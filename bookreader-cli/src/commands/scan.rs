//! Scan command implementation

use anyhow::{Context, Result};
use bookreader_core::{ReaderApp, ScanOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Scan the configured sources and reconcile the library
pub async fn scan(app: &ReaderApp) -> Result<()> {
    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, cancelling scan");
            handler_token.cancel();
        }
    });

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} [{elapsed_precise}] {msg}")
            .context("Invalid progress template")?,
    );
    spinner.set_message("Scanning for books...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = app.scan(cancel).await;
    spinner.finish_and_clear();

    match outcome.context("Scan failed")? {
        ScanOutcome::Completed(summary) => {
            println!("Scan complete:");
            println!("  Found:     {}", summary.found);
            println!("  Added:     {}", summary.sync.inserted);
            println!("  Removed:   {}", summary.sync.deleted);
            println!("  Unchanged: {}", summary.sync.unchanged);
            if summary.degraded > 0 {
                println!("  Metadata unavailable: {}", summary.degraded);
            }
            if summary.unreadable > 0 {
                println!("  Unreadable: {}", summary.unreadable);
            }
            for source in &summary.denied_sources {
                println!("  Permission denied: {}", source);
            }
        }
        ScanOutcome::PermissionRequired => {
            println!("No readable source. Add a folder with `bookreader folders add <DIR>` or use `scan --index`.");
        }
        ScanOutcome::Cancelled => println!("Scan cancelled; library unchanged."),
        ScanOutcome::AlreadyRunning => println!("A scan is already running."),
    }

    Ok(())
}
