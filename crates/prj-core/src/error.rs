//! Error types for the prj-core crate.
//!
//! This module provides the [`ConfigError`] type for configuration-related errors
//! that can occur across the workspace.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use prj_core::ConfigError;
///
/// let error = ConfigError::invalid_option("max_depth", "must be at least 1");
/// assert!(error.to_string().contains("max_depth"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration file path that cannot be used.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: Utf8PathBuf,
        /// Explanation of why the path is invalid.
        reason: String,
    },

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration {path}: {source}")]
    Io {
        /// The file being read.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration {path}: {source}")]
    Parse {
        /// The file being parsed.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Creates an [`InvalidOption`](Self::InvalidOption) error.
    #[must_use]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path_display() {
        let error = ConfigError::InvalidPath {
            path: Utf8PathBuf::from("/invalid/path"),
            reason: "is a directory".to_owned(),
        };
        let msg = error.to_string();
        assert!(msg.contains("/invalid/path"));
        assert!(msg.contains("is a directory"));
    }

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::invalid_option("batch_size", "must be positive");
        insta::assert_snapshot!(
            error.to_string(),
            @"invalid configuration option 'batch_size': must be positive"
        );
    }

    #[test]
    fn test_parse_error_keeps_path() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = ConfigError::Parse {
            path: Utf8PathBuf::from("prj.json"),
            source,
        };
        assert!(error.to_string().starts_with("failed to parse configuration prj.json"));
    }
}
