//! Runtime configuration

use std::path::{Path, PathBuf};

/// Overrides the data directory
pub const DATA_DIR_ENV: &str = "BOOKREADER_DATA_DIR";

/// Overrides scan parallelism
pub const JOBS_ENV: &str = "BOOKREADER_JOBS";

const DATABASE_FILE: &str = "library.db";
const PREFERENCES_FILE: &str = "preferences.json";
const FALLBACK_DATA_DIR: &str = "bookreader_data";

/// Where scans look for documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanMode {
    /// The folders saved in preferences
    Folders,
    /// Everything under a root, queried by MIME type like a device content index
    Index(PathBuf),
}

/// Resolved configuration for a [`crate::ReaderApp`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub preferences_path: PathBuf,
    pub scan_mode: ScanMode,
    /// Extraction threads
    pub jobs: usize,
}

impl Config {
    /// Configuration rooted at `data_dir`, with default settings
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            database_path: data_dir.join(DATABASE_FILE),
            preferences_path: data_dir.join(PREFERENCES_FILE),
            data_dir,
            scan_mode: ScanMode::Folders,
            jobs: default_jobs(),
        }
    }

    /// Resolve from an optional command-line data dir and the environment.
    ///
    /// Precedence: `data_dir` argument, `BOOKREADER_DATA_DIR`, the platform
    /// data directory, then `./bookreader_data`.
    pub fn resolve(data_dir: Option<PathBuf>) -> Self {
        Self::resolve_with(
            data_dir,
            std::env::var(DATA_DIR_ENV).ok(),
            std::env::var(JOBS_ENV).ok(),
        )
    }

    fn resolve_with(
        data_dir: Option<PathBuf>,
        env_data_dir: Option<String>,
        env_jobs: Option<String>,
    ) -> Self {
        let data_dir = data_dir
            .or_else(|| env_data_dir.filter(|d| !d.is_empty()).map(PathBuf::from))
            .or_else(platform_data_dir)
            .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR));

        let mut config = Self::new(data_dir);
        if let Some(jobs) = env_jobs {
            match jobs.trim().parse::<usize>() {
                Ok(jobs) if jobs > 0 => config.jobs = jobs,
                _ => tracing::warn!("Ignoring invalid {}={:?}", JOBS_ENV, jobs),
            }
        }
        config
    }

    pub fn with_scan_mode(mut self, scan_mode: ScanMode) -> Self {
        self.scan_mode = scan_mode;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn platform_data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "bookreader", "Bookreader")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Default root for index scans: the user's documents folder, else home
pub fn default_index_root() -> Option<PathBuf> {
    let dirs = directories::UserDirs::new()?;
    Some(
        dirs.document_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dirs.home_dir().to_path_buf()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_paths() {
        let config = Config::new("/tmp/br");
        assert_eq!(config.database_path, PathBuf::from("/tmp/br/library.db"));
        assert_eq!(config.preferences_path, PathBuf::from("/tmp/br/preferences.json"));
        assert_eq!(config.scan_mode, ScanMode::Folders);
        assert!(config.jobs >= 1);
    }

    #[test]
    fn test_flag_beats_env() {
        let config = Config::resolve_with(
            Some(PathBuf::from("/flag")),
            Some("/env".to_string()),
            None,
        );
        assert_eq!(config.data_dir, PathBuf::from("/flag"));
    }

    #[test]
    fn test_env_beats_platform() {
        let config = Config::resolve_with(None, Some("/env".to_string()), Some("3".to_string()));
        assert_eq!(config.data_dir, PathBuf::from("/env"));
        assert_eq!(config.jobs, 3);
    }

    #[test]
    fn test_invalid_jobs_ignored() {
        let config = Config::resolve_with(Some(PathBuf::from("/x")), None, Some("zero".to_string()));
        assert!(config.jobs >= 1);
        let config = Config::resolve_with(Some(PathBuf::from("/x")), None, Some("0".to_string()));
        assert!(config.jobs >= 1);
    }

    #[test]
    fn test_with_jobs_floor() {
        assert_eq!(Config::new("/x").with_jobs(0).jobs, 1);
    }
}
