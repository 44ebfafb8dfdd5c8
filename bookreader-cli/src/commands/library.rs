//! Library commands: list, open, progress

use super::{book_line, BookRow};
use anyhow::{Context, Result};
use bookreader_core::ReaderApp;

/// List every book in the library
pub async fn list(app: &ReaderApp, json: bool) -> Result<()> {
    let books = app.books().await.context("Failed to read the library")?;

    if json {
        let rows: Vec<BookRow> = books.iter().map(BookRow::from).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if books.is_empty() {
        println!("Library is empty. Run `bookreader scan` first.");
        return Ok(());
    }

    for book in &books {
        println!("{}", book_line(book));
        println!("    {}", book.id);
    }
    println!("\n{} books", books.len());
    Ok(())
}

/// Open a book
pub async fn open(app: &ReaderApp, id: &str) -> Result<()> {
    let book = app
        .open_book(id)
        .await
        .with_context(|| format!("Failed to open {}", id))?;
    println!("Opened {}", book_line(&book));
    Ok(())
}

/// Save reading progress
pub async fn progress(app: &ReaderApp, id: &str, current: i64, total: Option<i64>) -> Result<()> {
    if let Some(total) = total {
        app.set_total(id, total)
            .await
            .with_context(|| format!("Failed to set total for {}", id))?;
    }

    let book = app
        .update_progress(id, current)
        .await
        .with_context(|| format!("Failed to update progress for {}", id))?;

    println!("{}", book_line(&book));
    if book.is_finished() {
        println!("Finished!");
    }
    Ok(())
}
