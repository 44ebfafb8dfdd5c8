//! Persisted key-value state
//!
//! Everything the app remembers outside the library database lives in a
//! single JSON document. Each mutation rewrites the file through a temp file
//! and a rename, so a crash never leaves a half-written document behind.

use crate::error::PreferencesError;
use crate::types::HistoryEntry;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Reading goal used until the user picks one
pub const DEFAULT_READING_GOAL: u32 = 10;

/// Contents of `preferences.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesData {
    /// Folder URIs chosen by the user
    pub folders: Vec<String>,
    pub first_scan_done: bool,
    pub first_launch_done: bool,
    /// Book identifiers in the order they were first opened
    pub continue_reading: Vec<String>,
    /// One entry per book, newest first
    pub history: Vec<HistoryEntry>,
    pub reading_goal: u32,
    /// Epoch milliseconds of the last completed scan, 0 if never
    pub last_scan_time: i64,
    /// Identifiers found by the last completed scan
    pub scanned_books: Vec<String>,
}

impl Default for PreferencesData {
    fn default() -> Self {
        Self {
            folders: Vec::new(),
            first_scan_done: false,
            first_launch_done: false,
            continue_reading: Vec::new(),
            history: Vec::new(),
            reading_goal: DEFAULT_READING_GOAL,
            last_scan_time: 0,
            scanned_books: Vec::new(),
        }
    }
}

/// Shared handle on the preferences document
pub struct Preferences {
    /// `None` keeps everything in memory
    path: Option<PathBuf>,
    data: RwLock<PreferencesData>,
}

impl Preferences {
    /// Load preferences from `path`.
    ///
    /// A missing file yields defaults. A malformed file is logged and
    /// replaced by defaults on the next write.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, PreferencesError> {
        let path = path.into();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed preferences");
                    PreferencesData::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PreferencesData::default(),
            Err(e) => return Err(PreferencesError::Io { path, source: e }),
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// Preferences that are never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(PreferencesData::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy of the current document
    pub async fn snapshot(&self) -> PreferencesData {
        self.data.read().await.clone()
    }

    /// Mutate the document and persist it.
    ///
    /// The write lock is held across the save so writes land in order. The
    /// change is only applied in memory once it has been saved.
    pub async fn update<R>(
        &self,
        f: impl FnOnce(&mut PreferencesData) -> R,
    ) -> Result<R, PreferencesError> {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        let result = f(&mut next);
        if let Some(path) = &self.path {
            save(path, &next).await?;
        }
        *data = next;
        Ok(result)
    }

    // Folders

    pub async fn folders(&self) -> Vec<String> {
        self.data.read().await.folders.clone()
    }

    /// Returns false if the folder was already present
    pub async fn add_folder(&self, uri: &str) -> Result<bool, PreferencesError> {
        self.update(|d| {
            if d.folders.iter().any(|f| f == uri) {
                false
            } else {
                d.folders.push(uri.to_string());
                true
            }
        })
        .await
    }

    /// Returns false if the folder was not present
    pub async fn remove_folder(&self, uri: &str) -> Result<bool, PreferencesError> {
        self.update(|d| {
            let before = d.folders.len();
            d.folders.retain(|f| f != uri);
            d.folders.len() != before
        })
        .await
    }

    // Launch and scan flags

    pub async fn is_first_scan_done(&self) -> bool {
        self.data.read().await.first_scan_done
    }

    pub async fn is_first_launch(&self) -> bool {
        !self.data.read().await.first_launch_done
    }

    pub async fn set_first_launch_done(&self) -> Result<(), PreferencesError> {
        self.update(|d| d.first_launch_done = true).await
    }

    /// Record a completed scan
    pub async fn record_scan(
        &self,
        at: DateTime<Utc>,
        identifiers: Vec<String>,
    ) -> Result<(), PreferencesError> {
        self.update(|d| {
            d.first_scan_done = true;
            d.last_scan_time = at.timestamp_millis();
            d.scanned_books = identifiers;
        })
        .await
    }

    pub async fn last_scan_time(&self) -> Option<DateTime<Utc>> {
        match self.data.read().await.last_scan_time {
            0 => None,
            millis => Utc.timestamp_millis_opt(millis).single(),
        }
    }

    // Reading goal

    pub async fn goal(&self) -> u32 {
        self.data.read().await.reading_goal
    }

    pub async fn set_goal(&self, goal: u32) -> Result<(), PreferencesError> {
        self.update(|d| d.reading_goal = goal).await
    }

    // Continue reading and history

    pub async fn continue_reading(&self) -> Vec<String> {
        self.data.read().await.continue_reading.clone()
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.data.read().await.history.clone()
    }
}

/// Write to a temp file next to `path`, then rename over it
async fn save(path: &Path, data: &PreferencesData) -> Result<(), PreferencesError> {
    let text = serde_json::to_string_pretty(data)?;
    let io_err = |source: std::io::Error| PreferencesError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, text).await.map_err(io_err)?;
    tokio::fs::rename(&temp_path, path).await.map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        let prefs = Preferences::load(dir.path().join("preferences.json"))
            .await
            .unwrap();
        assert_eq!(prefs.goal().await, 10);
        assert!(prefs.is_first_launch().await);
        assert!(!prefs.is_first_scan_done().await);
        assert_eq!(prefs.last_scan_time().await, None);
    }

    #[tokio::test]
    async fn test_persists_across_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/preferences.json");

        let prefs = Preferences::load(&path).await.unwrap();
        assert!(prefs.add_folder("file:///books").await.unwrap());
        assert!(!prefs.add_folder("file:///books").await.unwrap());
        prefs.set_goal(25).await.unwrap();
        prefs.set_first_launch_done().await.unwrap();
        prefs
            .record_scan(Utc::now(), vec!["a".to_string()])
            .await
            .unwrap();

        let reloaded = Preferences::load(&path).await.unwrap();
        assert_eq!(reloaded.folders().await, vec!["file:///books".to_string()]);
        assert_eq!(reloaded.goal().await, 25);
        assert!(!reloaded.is_first_launch().await);
        assert!(reloaded.is_first_scan_done().await);
        assert_eq!(reloaded.snapshot().await.scanned_books, vec!["a".to_string()]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_malformed_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "{ not json").unwrap();

        let prefs = Preferences::load(&path).await.unwrap();
        assert_eq!(prefs.snapshot().await, PreferencesData::default());
    }

    #[tokio::test]
    async fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, r#"{"folders": ["/books"]}"#).unwrap();

        let prefs = Preferences::load(&path).await.unwrap();
        assert_eq!(prefs.folders().await, vec!["/books".to_string()]);
        assert_eq!(prefs.goal().await, DEFAULT_READING_GOAL);
    }

    #[tokio::test]
    async fn test_remove_folder() {
        let prefs = Preferences::in_memory();
        prefs.add_folder("/a").await.unwrap();
        assert!(prefs.remove_folder("/a").await.unwrap());
        assert!(!prefs.remove_folder("/a").await.unwrap());
        assert!(prefs.folders().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_leaves_memory_unchanged() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        let path = blocker.join("preferences.json");

        let prefs = Preferences::load(&path).await.unwrap();
        std::fs::write(&blocker, "a regular file").unwrap();

        assert!(matches!(
            prefs.set_goal(42).await,
            Err(PreferencesError::Io { .. })
        ));
        assert!(prefs.add_folder("/books").await.is_err());

        assert_eq!(prefs.goal().await, DEFAULT_READING_GOAL);
        assert!(prefs.folders().await.is_empty());
    }
}
