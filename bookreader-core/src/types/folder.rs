//! User-added scan roots

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A folder the user asked to scan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Folder {
    /// Last path segment, for display
    pub title: String,

    /// Normalized path relative to its volume (or absolute for local paths)
    pub path: String,

    /// The URI the folder was added with
    pub uri: String,
}

impl Folder {
    /// Build a folder from the URI it was persisted as.
    ///
    /// Accepts document-tree URIs (`content://…/tree/primary%3ABooks`),
    /// `file://` URIs and plain paths.
    pub fn from_uri(uri: &str) -> Self {
        let path = if let Some(tree) = tree_document_id(uri) {
            // "primary:Books/Sci" -> "Books/Sci"
            match tree.split_once(':') {
                Some((_, rest)) => rest.to_string(),
                None => tree,
            }
        } else if let Some(rest) = uri.strip_prefix("file://") {
            decode(rest)
        } else {
            uri.to_string()
        };

        let path = path.trim_end_matches('/').to_string();
        let title = path
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or(path.as_str())
            .to_string();

        Self {
            title,
            path,
            uri: uri.to_string(),
        }
    }

    /// Local filesystem location of the folder, if it has one.
    ///
    /// Document-tree URIs are only readable through the platform content
    /// resolver and have no local path.
    pub fn local_path(&self) -> Option<PathBuf> {
        if self.uri.starts_with("content://") {
            None
        } else {
            Some(PathBuf::from(&self.path))
        }
    }
}

/// Extract the decoded tree document id from a `content://…/tree/<id>` URI
fn tree_document_id(uri: &str) -> Option<String> {
    if !uri.starts_with("content://") {
        return None;
    }
    let (_, after) = uri.split_once("/tree/")?;
    let id = after.split('/').next().unwrap_or(after);
    Some(decode(id))
}

fn decode(s: &str) -> String {
    urlencoding::decode(s)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_uri() {
        let folder = Folder::from_uri(
            "content://com.android.externalstorage.documents/tree/primary%3ABooks%2FSci-Fi",
        );
        assert_eq!(folder.path, "Books/Sci-Fi");
        assert_eq!(folder.title, "Sci-Fi");
        assert_eq!(folder.local_path(), None);
    }

    #[test]
    fn test_file_uri() {
        let folder = Folder::from_uri("file:///home/reader/My%20Books/");
        assert_eq!(folder.path, "/home/reader/My Books");
        assert_eq!(folder.title, "My Books");
        assert_eq!(folder.local_path(), Some(PathBuf::from("/home/reader/My Books")));
    }

    #[test]
    fn test_plain_path() {
        let folder = Folder::from_uri("/srv/library");
        assert_eq!(folder.title, "library");
        assert_eq!(folder.uri, "/srv/library");
    }
}
