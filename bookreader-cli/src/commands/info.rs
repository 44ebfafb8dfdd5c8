//! Info command implementation

use super::BookRow;
use anyhow::{Context, Result};
use bookreader_core::extractor::{extract_or_fallback, extractor_for_extension};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Display the metadata extracted from a single file
pub fn info(input: &str, json: bool) -> Result<()> {
    let input_path = Path::new(input);

    let ext = input_path
        .extension()
        .and_then(|e| e.to_str())
        .context("Could not determine input file extension")?;

    let extractor = extractor_for_extension(ext)
        .with_context(|| format!("No extractor available for .{} files", ext))?;

    let file_name = input_path
        .file_name()
        .and_then(|n| n.to_str())
        .context("Could not determine file name")?;

    let file =
        File::open(input_path).with_context(|| format!("Failed to open input file: {}", input))?;
    let mut reader = BufReader::new(file);

    let id = std::fs::canonicalize(input_path)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| input.to_string());
    let book = extract_or_fallback(extractor.as_ref(), &id, file_name, &mut reader).book;
    let row = BookRow::from(&book);

    if json {
        println!("{}", serde_json::to_string_pretty(&row)?);
    } else {
        println!("Title:       {}", book.title);
        println!("Author:      {}", book.author);
        println!("Description: {}", book.description);
        println!("Format:      {}", book.format);
        if book.total_read > 0 {
            println!("Extent:      {}", book.total_read);
        }
        match &book.cover {
            Some(cover) => println!("Cover:       {} bytes", cover.len()),
            None => println!("Cover:       none"),
        }
    }

    Ok(())
}
