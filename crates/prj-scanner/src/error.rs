//! Error types for the prj-scanner crate.
//!
//! This module provides [`ScanError`] for failures that a caller must act
//! on, and [`Diagnostic`] for per-directory problems that are absorbed
//! into the scan report.
//!
//! # Error Recovery Strategy
//!
//! - **Root invalid** ([`ScanError::InvalidRoot`]): the scan never starts
//! - **Busy** ([`ScanError::Busy`]): another scan owns the session guard
//! - **Per-directory** failures: recorded as a [`Diagnostic`], scan continues
//! - **Persistence** failures ([`ScanError::Write`]): the in-memory
//!   collection is kept, the report says the save did not happen

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Errors surfaced by the scanner and cache store.
///
/// # Examples
///
/// ```
/// use prj_scanner::ScanError;
///
/// let err = ScanError::invalid_root("/missing", "does not exist");
/// assert!(!err.is_recoverable());
/// assert_eq!(err.path().map(|p| p.as_str()), Some("/missing"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The scan root does not exist or is not a directory.
    #[error("invalid scan root {path}: {reason}")]
    InvalidRoot {
        /// The requested root.
        path: Utf8PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// A scan is already running.
    #[error("a scan is already in progress")]
    Busy,

    /// Failed to read a file or directory.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The path that couldn't be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a cache file.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The file being written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to encode or decode a cache file.
    #[error("failed to encode {path}: {source}")]
    Encode {
        /// The file involved.
        path: Utf8PathBuf,
        /// The underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },

    /// No record exists for the given path.
    #[error("unknown project: {0}")]
    UnknownProject(Utf8PathBuf),

    /// A category key that is neither built in nor defined by the user.
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// A custom category would shadow an existing key.
    #[error("category already exists: {0}")]
    DuplicateCategory(String),

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// The background scan worker could not be started or did not finish.
    #[error("scan worker failed: {0}")]
    Worker(String),
}

impl ScanError {
    /// Creates a new [`ScanError::InvalidRoot`] error.
    #[inline]
    pub fn invalid_root(path: impl Into<Utf8PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidRoot {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new [`ScanError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`ScanError::Write`] error.
    #[inline]
    pub fn write(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this error is confined to one path and the
    /// surrounding operation can continue.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::NonUtf8Path(_))
    }

    /// Returns `true` if the request was rejected because a scan is running.
    #[inline]
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }

    /// Returns the path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::InvalidRoot { path, .. }
            | Self::Read { path, .. }
            | Self::Write { path, .. }
            | Self::Encode { path, .. }
            | Self::UnknownProject(path) => Some(path),
            Self::Busy
            | Self::UnknownCategory(_)
            | Self::DuplicateCategory(_)
            | Self::NonUtf8Path(_)
            | Self::Worker(_) => None,
        }
    }
}

/// What went wrong at a single path during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DiagnosticKind {
    /// The directory could not be listed; it was not descended into.
    Unreadable,
    /// The path is not valid UTF-8 and was skipped.
    NonUtf8,
    /// A symlinked directory resolved to an already visited location.
    SymlinkLoop,
    /// A single file inside a project could not be read; the field it
    /// feeds was left at its default.
    FieldDefaulted,
}

impl DiagnosticKind {
    /// Returns a short label for display.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unreadable => "unreadable",
            Self::NonUtf8 => "non-utf8",
            Self::SymlinkLoop => "symlink-loop",
            Self::FieldDefaulted => "field-defaulted",
        }
    }
}

/// A per-path problem absorbed during a scan.
///
/// # Examples
///
/// ```
/// use prj_scanner::{Diagnostic, DiagnosticKind};
///
/// let d = Diagnostic::new("/root/locked", DiagnosticKind::Unreadable, "permission denied");
/// assert_eq!(d.to_string(), "unreadable: /root/locked (permission denied)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The affected path, lossily converted if it was not UTF-8.
    pub path: String,
    /// Category of problem.
    pub kind: DiagnosticKind,
    /// Human-readable detail.
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic.
    pub fn new(path: impl Into<String>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.kind.label(), self.path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_scan_error_read() {
        let err = ScanError::read("proj/Cargo.toml", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.is_recoverable());
        assert!(!err.is_busy());
        assert_eq!(err.path().map(|p| p.as_str()), Some("proj/Cargo.toml"));
        assert!(err.to_string().contains("proj/Cargo.toml"));
    }

    #[test]
    fn test_scan_error_busy() {
        let err = ScanError::Busy;
        assert!(err.is_busy());
        assert!(!err.is_recoverable());
        assert!(err.path().is_none());
        assert_eq!(err.to_string(), "a scan is already in progress");
    }

    #[test]
    fn test_scan_error_invalid_root_display() {
        let err = ScanError::invalid_root("/nope", "does not exist");
        insta::assert_snapshot!(err.to_string(), @"invalid scan root /nope: does not exist");
    }

    #[test]
    fn test_diagnostic_serialization() {
        let d = Diagnostic::new("/x", DiagnosticKind::SymlinkLoop, "already visited");
        let json = serde_json::to_string(&d).unwrap();
        insta::assert_snapshot!(
            json,
            @r#"{"path":"/x","kind":"symlink_loop","message":"already visited"}"#
        );
    }
}
