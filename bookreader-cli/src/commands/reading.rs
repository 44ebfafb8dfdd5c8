//! Reading state commands: continue, history

use super::{book_line, BookRow};
use anyhow::{Context, Result};
use bookreader_core::ReaderApp;
use chrono::Local;
use serde::Serialize;

/// Show the continue-reading list
pub async fn continue_reading(app: &ReaderApp) -> Result<()> {
    let books = app
        .continue_reading()
        .await
        .context("Failed to read continue-reading list")?;

    if books.is_empty() {
        println!("Nothing to continue.");
    }
    for book in &books {
        println!("{}", book_line(book));
    }
    Ok(())
}

#[derive(Serialize)]
struct HistoryRow {
    label: String,
    items: Vec<HistoryItemRow>,
}

#[derive(Serialize)]
struct HistoryItemRow {
    opened_at: String,
    book: BookRow,
}

/// Show reading history grouped by day
pub async fn history(app: &ReaderApp, json: bool) -> Result<()> {
    let now = Local::now();
    let groups = app
        .grouped_history(&now)
        .await
        .context("Failed to read history")?;

    if json {
        let rows: Vec<HistoryRow> = groups
            .iter()
            .map(|group| HistoryRow {
                label: group.label.clone(),
                items: group
                    .items
                    .iter()
                    .map(|item| HistoryItemRow {
                        opened_at: item.opened_at().with_timezone(&Local).to_rfc3339(),
                        book: BookRow::from(&item.book),
                    })
                    .collect(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if groups.is_empty() {
        println!("No history yet.");
    }
    for group in &groups {
        println!("{}", group.label);
        for item in &group.items {
            let at = item.opened_at().with_timezone(&Local);
            println!("  {}  {}", at.format("%H:%M"), book_line(&item.book));
        }
    }
    Ok(())
}
