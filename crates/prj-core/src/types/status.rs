//! Scan lifecycle phases.
//!
//! This module provides the [`ScanPhase`] enum describing where the scan
//! orchestrator is in its lifecycle.

use serde::{Deserialize, Serialize};

/// The lifecycle phase of the scan orchestrator.
///
/// The orchestrator moves `Idle → Scanning → (Completed | Cancelled | Failed)`
/// and then back to `Idle` once the terminal phase has been reported.
///
/// # Examples
///
/// ```
/// use prj_core::ScanPhase;
///
/// assert!(ScanPhase::Scanning.is_active());
/// assert!(ScanPhase::Cancelled.is_terminal());
/// assert!(!ScanPhase::Idle.is_terminal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ScanPhase {
    /// No scan is running.
    #[default]
    Idle,

    /// A scan is walking the filesystem.
    Scanning,

    /// The walk finished and the merged collection was persisted.
    Completed,

    /// The scan was cancelled; the cache was left untouched.
    Cancelled,

    /// The scan could not start (invalid root).
    Failed,
}

impl ScanPhase {
    /// Returns `true` while a scan is running.
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Scanning)
    }

    /// Returns `true` for the three end states of a scan.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Returns a human-readable label for this phase.
    ///
    /// # Examples
    ///
    /// ```
    /// use prj_core::ScanPhase;
    ///
    /// assert_eq!(ScanPhase::Completed.label(), "Completed");
    /// ```
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Scanning => "Scanning",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(ScanPhase::default(), ScanPhase::Idle);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(ScanPhase::Completed.is_terminal());
        assert!(ScanPhase::Cancelled.is_terminal());
        assert!(ScanPhase::Failed.is_terminal());
        assert!(!ScanPhase::Scanning.is_terminal());
        assert!(!ScanPhase::Idle.is_active());
    }

    #[test]
    fn test_serialization() {
        assert_eq!(
            serde_json::to_string(&ScanPhase::Cancelled).unwrap(),
            r#""cancelled""#
        );
    }
}
