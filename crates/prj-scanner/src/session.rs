//! Scan sessions and the single-scan guard.
//!
//! At most one [`ScanSession`] is live per orchestrator. Ownership of the
//! session slot is an RAII [`ScanGuard`]: acquiring it flips an atomic
//! flag, dropping it clears the flag, so a panicking worker still releases
//! the slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use camino::{Utf8Path, Utf8PathBuf};
use tokio_util::sync::CancellationToken;

use crate::stats::{ScanStats, StatsSnapshot};

/// Exclusive claim on the scan slot.
#[derive(Debug)]
pub(crate) struct ScanGuard {
    active: Arc<AtomicBool>,
}

impl ScanGuard {
    /// Claims the slot, or returns `None` if a scan holds it.
    pub(crate) fn acquire(active: &Arc<AtomicBool>) -> Option<Self> {
        active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                active: Arc::clone(active),
            })
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// State of one running scan.
///
/// Cloning shares the cancellation token and counters.
#[derive(Debug, Clone)]
pub struct ScanSession {
    root: Utf8PathBuf,
    started_at: u64,
    started: Instant,
    cancel: CancellationToken,
    stats: Arc<ScanStats>,
}

impl ScanSession {
    pub(crate) fn new(root: Utf8PathBuf) -> Self {
        Self {
            root,
            started_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs()),
            started: Instant::now(),
            cancel: CancellationToken::new(),
            stats: Arc::new(ScanStats::new()),
        }
    }

    /// Canonical scan root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Start time, Unix seconds.
    #[must_use]
    pub const fn started_at(&self) -> u64 {
        self.started_at
    }

    /// Time since the scan started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Requests cooperative cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Current counters.
    #[must_use]
    pub fn progress(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn stats(&self) -> Arc<ScanStats> {
        Arc::clone(&self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_is_exclusive() {
        let active = Arc::new(AtomicBool::new(false));
        let guard = ScanGuard::acquire(&active).unwrap();
        assert!(ScanGuard::acquire(&active).is_none());
        drop(guard);
        assert!(ScanGuard::acquire(&active).is_some());
    }

    #[test]
    fn test_session_cancel_is_shared() {
        let session = ScanSession::new(Utf8PathBuf::from("/r"));
        let clone = session.clone();
        clone.cancel();
        assert!(session.is_cancelled());
        assert!(session.token().is_cancelled());
    }
}
