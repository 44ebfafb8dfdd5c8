//! Metadata extractors for supported document formats
//!
//! An extractor reads a document and returns whatever metadata it carries as
//! a [`BookMeta`]. Callers that build library records go through
//! [`extract_or_fallback`], which never fails: a document that cannot be
//! parsed still yields a book titled after its file name.

pub mod cover;
mod epub;
mod pdf;

pub use epub::EpubExtractor;
pub use pdf::{EmbeddedImageRenderer, PageRenderer, PdfExtractor};

use crate::error::ExtractError;
use crate::types::{Book, BookFormat, BookMeta};
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Trait for reading metadata out of a document
pub trait Extractor: Send + Sync {
    /// Extract metadata from a reader
    fn extract(&self, reader: &mut dyn Read) -> Result<BookMeta, ExtractError>;

    /// Format this extractor handles
    fn format(&self) -> BookFormat;

    /// File extensions this extractor supports
    fn supported_extensions(&self) -> &[&str];

    /// MIME types this extractor supports
    fn supported_mime_types(&self) -> &[&str];
}

/// Get the appropriate extractor for a file extension
pub fn extractor_for_extension(ext: &str) -> Option<Box<dyn Extractor>> {
    let ext = ext.to_lowercase();
    BookFormat::ALL
        .into_iter()
        .map(extractor_for_format)
        .find(|e| e.supported_extensions().contains(&ext.as_str()))
}

/// Get the appropriate extractor for a MIME type
pub fn extractor_for_mime_type(mime: &str) -> Option<Box<dyn Extractor>> {
    BookFormat::ALL
        .into_iter()
        .map(extractor_for_format)
        .find(|e| e.supported_mime_types().contains(&mime))
}

/// Get the default extractor for a format
pub fn extractor_for_format(format: BookFormat) -> Box<dyn Extractor> {
    match format {
        BookFormat::Pdf => Box::new(PdfExtractor::new()),
        BookFormat::Epub => Box::new(EpubExtractor::new()),
    }
}

/// A book built by [`extract_or_fallback`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub book: Book,

    /// Metadata could not be read; the book carries file-name defaults
    pub degraded: bool,
}

/// Extract a book, degrading to file-name metadata on any failure.
///
/// A panic inside a parser counts as a failure of this document only.
pub fn extract_or_fallback(
    extractor: &dyn Extractor,
    id: &str,
    file_name: &str,
    reader: &mut dyn Read,
) -> Extracted {
    let result = panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(reader)));
    let error = match result {
        Ok(Ok(meta)) => {
            return Extracted {
                book: meta.into_book(id, file_name, extractor.format()),
                degraded: false,
            }
        }
        Ok(Err(e)) => e.to_string(),
        Err(_) => {
            tracing::warn!(file = file_name, "Extractor panicked");
            "extractor panicked".to_string()
        }
    };

    tracing::debug!(file = file_name, error = %error, "Extraction failed, using file name");
    Extracted {
        book: Book::from_file_name(id, file_name, extractor.format()),
        degraded: true,
    }
}

/// One extractor per supported format, shared across scan workers
#[derive(Clone)]
pub struct Extractors {
    pdf: Arc<PdfExtractor>,
    epub: Arc<EpubExtractor>,
}

impl Extractors {
    pub fn new() -> Self {
        Self {
            pdf: Arc::new(PdfExtractor::new()),
            epub: Arc::new(EpubExtractor::new()),
        }
    }

    pub fn for_format(&self, format: BookFormat) -> &dyn Extractor {
        match format {
            BookFormat::Pdf => self.pdf.as_ref(),
            BookFormat::Epub => self.epub.as_ref(),
        }
    }
}

impl Default for Extractors {
    fn default() -> Self {
        Self::new()
    }
}
