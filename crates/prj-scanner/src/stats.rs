//! Scan progress counters.
//!
//! [`ScanStats`] is shared between the walker, the extraction pool and the
//! orchestrator; [`StatsSnapshot`] is the copy that travels in progress
//! events and reports.
//!
//! All counters use [`Relaxed`](std::sync::atomic::Ordering::Relaxed)
//! ordering. They are informational and never used for synchronisation.
//!
//! # Examples
//!
//! ```
//! use prj_scanner::ScanStats;
//!
//! let stats = ScanStats::new();
//! stats.increment_dirs_visited();
//! stats.increment_projects_found();
//!
//! let snapshot = stats.snapshot();
//! assert_eq!(snapshot.dirs_visited, 1);
//! assert_eq!(snapshot.projects_found, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters for one scan session.
#[derive(Debug, Default)]
pub struct ScanStats {
    /// Directories popped off the walk stack.
    dirs_visited: AtomicU64,
    /// Directories classified as projects.
    projects_found: AtomicU64,
    /// Directories pruned by the exclusion rules or depth limit.
    skipped: AtomicU64,
    /// Per-path problems recorded as diagnostics.
    errors: AtomicU64,
}

impl ScanStats {
    /// Creates a new [`ScanStats`] with all counters at zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the visited-directories counter.
    #[inline]
    pub fn increment_dirs_visited(&self) {
        self.dirs_visited.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the projects-found counter.
    #[inline]
    pub fn increment_projects_found(&self) {
        self.projects_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the skipped-directories counter.
    #[inline]
    pub fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the error counter.
    #[inline]
    pub fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            dirs_visited: self.dirs_visited.load(Ordering::Relaxed),
            projects_found: self.projects_found.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// A copy of [`ScanStats`] at one moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Directories visited.
    pub dirs_visited: u64,
    /// Projects found.
    pub projects_found: u64,
    /// Directories pruned.
    pub skipped: u64,
    /// Diagnostics recorded.
    pub errors: u64,
}

impl StatsSnapshot {
    /// Share of visited directories that turned out to be projects, in
    /// percent. Returns 0.0 before anything was visited.
    ///
    /// # Examples
    ///
    /// ```
    /// use prj_scanner::StatsSnapshot;
    ///
    /// let snap = StatsSnapshot { dirs_visited: 8, projects_found: 2, ..Default::default() };
    /// assert!((snap.hit_rate() - 25.0).abs() < 0.1);
    /// ```
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Acceptable for statistics display
    pub fn hit_rate(&self) -> f64 {
        if self.dirs_visited == 0 {
            return 0.0;
        }
        (self.projects_found as f64 / self.dirs_visited as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_stats_increment() {
        let stats = ScanStats::new();
        stats.increment_dirs_visited();
        stats.increment_dirs_visited();
        stats.increment_projects_found();
        stats.increment_skipped();
        stats.increment_errors();

        let snap = stats.snapshot();
        assert_eq!(snap.dirs_visited, 2);
        assert_eq!(snap.projects_found, 1);
        assert_eq!(snap.skipped, 1);
        assert_eq!(snap.errors, 1);
    }

    #[test]
    fn test_hit_rate_empty() {
        assert!(StatsSnapshot::default().hit_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_serialization() {
        let snap = StatsSnapshot {
            dirs_visited: 10,
            projects_found: 3,
            skipped: 2,
            errors: 1,
        };
        let json = serde_json::to_string(&snap).unwrap();
        insta::assert_snapshot!(
            json,
            @r#"{"dirs_visited":10,"projects_found":3,"skipped":2,"errors":1}"#
        );
    }
}
