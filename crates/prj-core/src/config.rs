//! Configuration structures for the prj project browser.
//!
//! - [`ScanConfig`] - Walker, classifier and orchestrator settings
//! - [`StoreConfig`] - Where the project cache and side tables live
//! - [`WatchConfig`] - Debouncing of the project watcher
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`], and every field is
//! optional in the JSON file.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Configuration for the scanner.
///
/// # Examples
///
/// ```
/// use prj_core::ScanConfig;
///
/// let config = ScanConfig::default();
/// assert_eq!(config.max_depth, 4);
/// assert!(!config.follow_links);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum recursion depth below the scan root. Children of the root
    /// are at depth 1.
    pub max_depth: usize,

    /// How deep inside a project the classifier samples file extensions
    /// and the extractor looks for version files.
    pub language_sample_depth: usize,

    /// Directory names to exclude in addition to the built-in set.
    pub skip_dirs: Vec<String>,

    /// Whether to descend into symlinked directories.
    pub follow_links: bool,

    /// Whether to descend into dot-directories.
    pub include_hidden: bool,

    /// Maximum number of parallel metadata jobs.
    /// `None` means use all available CPU cores.
    pub max_parallel_jobs: Option<usize>,

    /// Number of candidate directories extracted per batch.
    pub batch_size: usize,

    /// Maximum time between progress events, in milliseconds.
    pub batch_interval_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            language_sample_depth: 3,
            skip_dirs: Vec::new(),
            follow_links: false,
            include_hidden: false,
            max_parallel_jobs: None,
            batch_size: 32,
            batch_interval_ms: 250,
        }
    }
}

/// Configuration for the cache store.
///
/// # Examples
///
/// ```
/// use prj_core::StoreConfig;
///
/// let config = StoreConfig::default();
/// assert_eq!(config.data_dir, "data");
/// assert_eq!(config.max_recent_projects, 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding `projects.json` and the side tables.
    pub data_dir: Utf8PathBuf,

    /// How many recently opened projects to remember.
    pub max_recent_projects: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: Utf8PathBuf::from("data"),
            max_recent_projects: 20,
        }
    }
}

/// Shortest accepted debounce window, in milliseconds.
pub const MIN_DEBOUNCE_MS: u64 = 100;

/// Configuration for the project watcher.
///
/// # Examples
///
/// ```
/// use prj_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 1000);
/// assert!(config.ignore.contains(&".idea".to_owned()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period after the last change before a project is rescanned.
    pub debounce_ms: u64,

    /// Directory names whose changes never trigger a rescan, in addition
    /// to the scanner's exclusions.
    pub ignore: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            ignore: vec![".vscode".to_owned(), ".idea".to_owned()],
        }
    }
}

/// Root configuration.
///
/// # Examples
///
/// ```
/// use prj_core::Config;
///
/// let config = Config::default();
/// assert!(config.validate().is_ok());
///
/// let json = serde_json::to_string_pretty(&config).unwrap();
/// assert!(json.contains("max_depth"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scanner configuration.
    pub scan: ScanConfig,

    /// Cache store configuration.
    pub store: StoreConfig,

    /// Watcher configuration.
    pub watch: WatchConfig,
}

impl Config {
    /// Loads and validates configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is not valid JSON, and
    /// [`ConfigError::InvalidOption`] if a value fails validation.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        if path.is_dir() {
            return Err(ConfigError::InvalidPath {
                path: path.to_owned(),
                reason: "is a directory".to_owned(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path` if it exists, otherwise returns the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`] for a file that exists.
    pub fn load_or_default(path: &Utf8Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Checks option values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] for a zero `max_depth`,
    /// `batch_size`, `max_parallel_jobs` or `max_recent_projects`, and for
    /// a `watch.debounce_ms` below [`MIN_DEBOUNCE_MS`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.max_depth == 0 {
            return Err(ConfigError::invalid_option("scan.max_depth", "must be at least 1"));
        }
        if self.scan.batch_size == 0 {
            return Err(ConfigError::invalid_option("scan.batch_size", "must be at least 1"));
        }
        if self.scan.max_parallel_jobs == Some(0) {
            return Err(ConfigError::invalid_option(
                "scan.max_parallel_jobs",
                "must be at least 1 when set",
            ));
        }
        if self.store.max_recent_projects == 0 {
            return Err(ConfigError::invalid_option(
                "store.max_recent_projects",
                "must be at least 1",
            ));
        }
        if self.watch.debounce_ms < MIN_DEBOUNCE_MS {
            return Err(ConfigError::invalid_option(
                "watch.debounce_ms",
                format!("must be at least {MIN_DEBOUNCE_MS}"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_config_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.language_sample_depth, 3);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.batch_interval_ms, 250);
        assert!(config.skip_dirs.is_empty());
        assert!(config.max_parallel_jobs.is_none());
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let json = r#"{"scan": {"max_depth": 2}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.scan.max_depth, 2);
        assert_eq!(config.scan.batch_size, 32);
        assert_eq!(config.store.data_dir, "data");
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = Config::default();
        config.scan.max_depth = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOption { option, .. }) if option == "scan.max_depth"
        ));

        let mut config = Config::default();
        config.scan.max_parallel_jobs = Some(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.watch.debounce_ms = 10;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOption { option, .. }) if option == "watch.debounce_ms"
        ));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("absent.json")).unwrap();
        assert_eq!(Config::load_or_default(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("prj.json")).unwrap();
        std::fs::write(&path, r#"{"store": {"data_dir": "/tmp/prj-data"}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.store.data_dir, "/tmp/prj-data");
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("prj.json")).unwrap();
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }
}
