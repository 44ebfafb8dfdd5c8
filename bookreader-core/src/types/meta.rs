//! Raw metadata produced by an extractor

use super::book::{Book, BookFormat, NO_DESCRIPTION, UNKNOWN_AUTHOR};

/// Metadata read out of a single document
///
/// Every field is optional; [`BookMeta::into_book`] applies the library
/// defaults for whatever the document did not carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookMeta {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub cover: Option<Vec<u8>>,
    /// Page count (PDF) or spine length (EPUB)
    pub extent: Option<u32>,
}

impl BookMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title, ignoring blank values
    pub fn with_title(mut self, title: impl AsRef<str>) -> Self {
        self.title = non_blank(title.as_ref());
        self
    }

    /// Set the author, ignoring blank values
    pub fn with_author(mut self, author: impl AsRef<str>) -> Self {
        self.author = non_blank(author.as_ref());
        self
    }

    /// Set the description, ignoring blank values
    pub fn with_description(mut self, description: impl AsRef<str>) -> Self {
        self.description = non_blank(description.as_ref());
        self
    }

    /// Resolve into a library record
    pub fn into_book(self, id: impl Into<String>, file_name: &str, format: BookFormat) -> Book {
        let mut book = Book::from_file_name(id, file_name, format);
        if let Some(title) = self.title {
            book.title = title;
        }
        book.author = self.author.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
        book.description = self
            .description
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());
        book.cover = self.cover;
        book.total_read = self.extent.map(i64::from).unwrap_or(0);
        book
    }
}

/// Trim a value and treat blank strings as absent
pub fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_are_absent() {
        let meta = BookMeta::new().with_title("   ").with_author("\n");
        assert_eq!(meta.title, None);
        assert_eq!(meta.author, None);
    }

    #[test]
    fn test_into_book_applies_defaults() {
        let book = BookMeta::new()
            .with_title("  Dune ")
            .into_book("id", "book1.pdf", BookFormat::Pdf);
        assert_eq!(book.title, "Dune");
        assert_eq!(book.author, "Unknown");
        assert_eq!(book.description, "No description");
    }

    #[test]
    fn test_metadata_title_keeps_dots() {
        let book = BookMeta::new()
            .with_title("Dr. No")
            .into_book("id", "dr-no.epub", BookFormat::Epub);
        assert_eq!(book.title, "Dr. No");
    }

    #[test]
    fn test_extent_becomes_total() {
        let mut meta = BookMeta::new();
        meta.extent = Some(312);
        let book = meta.into_book("id", "a.pdf", BookFormat::Pdf);
        assert_eq!(book.total_read, 312);
        assert_eq!(book.current_read, 0);
    }
}
