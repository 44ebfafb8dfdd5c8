//! The Book record persisted in the library

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Author used when a document carries none
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Description used when a document carries none
pub const NO_DESCRIPTION: &str = "No description";

/// MIME type of PDF documents
pub const PDF_MIME: &str = "application/pdf";

/// MIME type of EPUB documents
pub const EPUB_MIME: &str = "application/epub+zip";

/// Document formats the scanner accepts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookFormat {
    Pdf,
    Epub,
}

impl BookFormat {
    /// Every supported format, in scan allowlist order
    pub const ALL: [BookFormat; 2] = [BookFormat::Pdf, BookFormat::Epub];

    pub fn mime_type(self) -> &'static str {
        match self {
            BookFormat::Pdf => PDF_MIME,
            BookFormat::Epub => EPUB_MIME,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            BookFormat::Pdf => "pdf",
            BookFormat::Epub => "epub",
        }
    }

    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime {
            PDF_MIME => Some(BookFormat::Pdf),
            EPUB_MIME => Some(BookFormat::Epub),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(BookFormat::Pdf),
            "epub" => Some(BookFormat::Epub),
            _ => None,
        }
    }

    /// Guess the format from a file name's extension
    pub fn from_file_name(name: &str) -> Option<Self> {
        name.rsplit_once('.')
            .and_then(|(_, ext)| Self::from_extension(ext))
    }
}

impl fmt::Display for BookFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for BookFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| format!("unknown book format: {}", s))
    }
}

/// A book in the local library
///
/// `id` is the stable document identifier (content handle or absolute path)
/// and is the only identity a book has: two records with the same `id` are
/// the same book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Book {
    /// Stable document identifier
    pub id: String,

    /// Display title
    pub title: String,

    /// Primary author
    pub author: String,

    /// Summary text
    pub description: String,

    /// Encoded cover image, absent when none could be extracted
    #[serde(default, with = "base64_opt", skip_serializing_if = "Option::is_none")]
    pub cover: Option<Vec<u8>>,

    /// Current reading position
    pub current_read: i64,

    /// Total reading extent (pages or spine items), 0 when unknown
    pub total_read: i64,

    /// Source format
    pub format: BookFormat,
}

impl Book {
    /// Create a book carrying only the file-name derived defaults
    pub fn from_file_name(
        id: impl Into<String>,
        file_name: &str,
        format: BookFormat,
    ) -> Self {
        Self {
            id: id.into(),
            title: title_from_file_name(file_name),
            author: UNKNOWN_AUTHOR.to_string(),
            description: NO_DESCRIPTION.to_string(),
            cover: None,
            current_read: 0,
            total_read: 0,
            format,
        }
    }

    pub fn has_cover(&self) -> bool {
        self.cover.is_some()
    }

    /// Whether the reader has reached the end of the book
    pub fn is_finished(&self) -> bool {
        self.total_read > 0 && self.current_read >= self.total_read
    }
}

/// Strip the last extension from a file name.
///
/// Hidden files such as `.pdf` keep their name.
pub fn title_from_file_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file_name.to_string(),
    }
}

/// Base64 serialization for optional binary data
mod base64_opt {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match data {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| STANDARD.decode(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_file_name() {
        assert_eq!(title_from_file_name("notes.epub"), "notes");
        assert_eq!(title_from_file_name("my.book.pdf"), "my.book");
        assert_eq!(title_from_file_name("README"), "README");
        assert_eq!(title_from_file_name(".pdf"), ".pdf");
    }

    #[test]
    fn test_book_defaults() {
        let book = Book::from_file_name("/books/notes.epub", "notes.epub", BookFormat::Epub);
        assert_eq!(book.title, "notes");
        assert_eq!(book.author, UNKNOWN_AUTHOR);
        assert_eq!(book.description, NO_DESCRIPTION);
        assert_eq!(book.current_read, 0);
        assert_eq!(book.total_read, 0);
        assert!(!book.has_cover());
    }

    #[test]
    fn test_format_lookup() {
        assert_eq!(BookFormat::from_mime_type("application/pdf"), Some(BookFormat::Pdf));
        assert_eq!(BookFormat::from_file_name("a.EPUB"), Some(BookFormat::Epub));
        assert_eq!(BookFormat::from_file_name("a.mobi"), None);
        assert_eq!("pdf".parse::<BookFormat>().unwrap(), BookFormat::Pdf);
    }

    #[test]
    fn test_book_serialization() {
        let mut book = Book::from_file_name("id-1", "dune.pdf", BookFormat::Pdf);
        book.cover = Some(vec![1, 2, 3]);
        let json = serde_json::to_string(&book).unwrap();
        assert!(json.contains("\"cover\":\"AQID\""));
        let back: Book = serde_json::from_str(&json).unwrap();
        assert_eq!(back, book);
    }

    #[test]
    fn test_is_finished() {
        let mut book = Book::from_file_name("id", "a.pdf", BookFormat::Pdf);
        assert!(!book.is_finished());
        book.total_read = 10;
        book.current_read = 10;
        assert!(book.is_finished());
    }
}
