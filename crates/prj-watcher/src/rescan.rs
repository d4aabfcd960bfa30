//! Turning project changes into scans.
//!
//! A changed project is refreshed by scanning its parent directory: a scan
//! never classifies its own root, so the project must be one level below
//! it. Pending roots are coalesced in a [`RescanQueue`]; a root already
//! covered by a queued ancestor is not queued again.
//!
//! [`Rescanner`] drains the queue through a [`ScanStarter`]. A
//! [`ScanError::Busy`] answer puts the root back and the next retry tick
//! tries again; any other rejection drops the root with a warning.

use std::collections::BTreeSet;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use prj_scanner::{ScanError, ScanHandle, ScanOrchestrator};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::ProjectChange;
use crate::watcher::ProjectWatcher;

/// Something that can start a background scan.
pub trait ScanStarter: Send + Sync {
    /// Starts a scan of `root`.
    ///
    /// # Errors
    ///
    /// Same as [`ScanOrchestrator::start_scan`].
    fn start_scan(&self, root: &Utf8Path) -> Result<ScanHandle, ScanError>;
}

impl ScanStarter for ScanOrchestrator {
    fn start_scan(&self, root: &Utf8Path) -> Result<ScanHandle, ScanError> {
        Self::start_scan(self, root)
    }
}

/// Scan roots waiting to be rescanned, without overlap.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use prj_watcher::RescanQueue;
///
/// let mut queue = RescanQueue::new();
/// assert!(queue.push_project(Utf8Path::new("/src/group/app")));
/// assert!(!queue.push_project(Utf8Path::new("/src/group/lib")));
/// assert!(queue.push_project(Utf8Path::new("/src/app")));
/// assert_eq!(queue.len(), 1);
/// assert_eq!(queue.pop().as_deref(), Some(Utf8Path::new("/src")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RescanQueue {
    roots: BTreeSet<Utf8PathBuf>,
}

impl RescanQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued roots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Queues the scan that refreshes `project`. Returns `false` if it is
    /// already covered, or if `project` has no parent.
    pub fn push_project(&mut self, project: &Utf8Path) -> bool {
        project
            .parent()
            .is_some_and(|root| self.push_root(root.to_owned()))
    }

    /// Queues `root`, replacing queued descendants. Returns `false` if
    /// `root` or an ancestor is already queued.
    pub fn push_root(&mut self, root: Utf8PathBuf) -> bool {
        if self.roots.iter().any(|queued| root.starts_with(queued)) {
            return false;
        }
        self.roots.retain(|queued| !queued.starts_with(&root));
        self.roots.insert(root)
    }

    /// Takes the first queued root in path order.
    pub fn pop(&mut self) -> Option<Utf8PathBuf> {
        self.roots.pop_first()
    }
}

/// Feeds project changes into scans.
#[derive(Debug)]
pub struct Rescanner<S> {
    scanner: S,
    queue: RescanQueue,
    retry: Duration,
}

impl<S: ScanStarter> Rescanner<S> {
    /// Creates a rescanner that retries busy roots every `retry`.
    #[must_use]
    pub fn new(scanner: S, retry: Duration) -> Self {
        Self {
            scanner,
            queue: RescanQueue::new(),
            retry,
        }
    }

    /// Roots waiting for a scan.
    #[must_use]
    pub const fn queue(&self) -> &RescanQueue {
        &self.queue
    }

    /// Queues the rescan for a change.
    pub fn enqueue(&mut self, change: &ProjectChange) -> bool {
        let queued = self.queue.push_project(&change.project);
        debug!(project = %change.project, queued, "Change received");
        queued
    }

    /// Runs queued scans one after another until the queue is empty or the
    /// scanner is busy. Returns how many scans completed.
    pub async fn drain(&mut self) -> usize {
        let mut completed = 0;
        while let Some(root) = self.queue.pop() {
            let handle = match self.scanner.start_scan(&root) {
                Ok(handle) => handle,
                Err(e) if e.is_busy() => {
                    debug!(root = %root, "Scanner busy, will retry");
                    self.queue.push_root(root);
                    break;
                }
                Err(e) => {
                    warn!(root = %root, error = %e, "Dropping rescan");
                    continue;
                }
            };

            match tokio::task::spawn_blocking(move || handle.wait()).await {
                Ok(Ok(outcome)) => {
                    let report = outcome.report();
                    info!(
                        root = %root,
                        added = report.merge.added,
                        updated = report.merge.updated,
                        removed = report.merge.removed,
                        cancelled = outcome.is_cancelled(),
                        "Rescan finished"
                    );
                    completed += 1;
                }
                Ok(Err(e)) => warn!(root = %root, error = %e, "Rescan failed"),
                Err(e) => warn!(root = %root, error = %e, "Rescan task failed"),
            }
        }
        completed
    }

    /// Rescans on every change from `watcher` until `cancel` fires or the
    /// watcher stops.
    pub async fn run(mut self, watcher: &mut ProjectWatcher, cancel: CancellationToken) {
        let mut retry = tokio::time::interval(self.retry);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                change = watcher.recv() => {
                    let Some(change) = change else { break };
                    self.enqueue(&change);
                    self.drain().await;
                }
                _ = retry.tick(), if !self.queue.is_empty() => {
                    self.drain().await;
                }
            }
        }
        if !self.queue.is_empty() {
            info!(pending = self.queue.len(), "Stopping with rescans still queued");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use prj_core::ScanConfig;
    use prj_scanner::CacheStore;
    use tempfile::TempDir;

    /// Reports busy for the first `busy` calls, then scans for real.
    struct BusyFirst {
        busy: AtomicUsize,
        inner: ScanOrchestrator,
    }

    impl ScanStarter for BusyFirst {
        fn start_scan(&self, root: &Utf8Path) -> Result<ScanHandle, ScanError> {
            if self.busy.load(Ordering::SeqCst) > 0 {
                self.busy.fetch_sub(1, Ordering::SeqCst);
                return Err(ScanError::Busy);
            }
            self.inner.start_scan(root)
        }
    }

    fn setup() -> (TempDir, Utf8PathBuf, ScanOrchestrator) {
        let dir = TempDir::new().unwrap();
        let base = Utf8PathBuf::try_from(dir.path().canonicalize().unwrap()).unwrap();
        let app = base.join("src/app");
        fs::create_dir_all(&app).unwrap();
        fs::write(app.join("main.py"), "print('hi')\n").unwrap();
        let (store, _) = CacheStore::open(&base.join("data"), 20).unwrap();
        let orchestrator = ScanOrchestrator::new(ScanConfig::default(), Arc::new(store));
        (dir, app, orchestrator)
    }

    fn change(project: &Utf8Path) -> ProjectChange {
        ProjectChange {
            project: project.to_owned(),
            paths: vec![project.join("main.py")],
        }
    }

    #[test]
    fn test_queue_coalesces_roots() {
        let mut queue = RescanQueue::new();
        assert!(queue.push_root(Utf8PathBuf::from("/src/a/b")));
        assert!(queue.push_root(Utf8PathBuf::from("/src/c")));
        assert!(queue.push_root(Utf8PathBuf::from("/src/a")));
        assert!(!queue.push_root(Utf8PathBuf::from("/src/a/b/c")));
        assert_eq!(queue.len(), 2);
        assert!(!queue.push_project(Utf8Path::new("/")));
    }

    #[tokio::test]
    async fn test_change_rescans_parent() {
        let (_dir, app, orchestrator) = setup();
        let store = Arc::clone(orchestrator.store());
        let mut rescanner = Rescanner::new(orchestrator, Duration::from_millis(10));

        assert!(rescanner.enqueue(&change(&app)));
        assert_eq!(rescanner.drain().await, 1);
        assert!(rescanner.queue().is_empty());
        assert!(store.get(&app).is_some());
    }

    #[tokio::test]
    async fn test_busy_root_is_retried() {
        let (_dir, app, orchestrator) = setup();
        let store = Arc::clone(orchestrator.store());
        let mut rescanner = Rescanner::new(
            BusyFirst {
                busy: AtomicUsize::new(1),
                inner: orchestrator,
            },
            Duration::from_millis(10),
        );

        rescanner.enqueue(&change(&app));
        assert_eq!(rescanner.drain().await, 0);
        assert_eq!(rescanner.queue().len(), 1);
        assert!(store.is_empty());

        assert_eq!(rescanner.drain().await, 1);
        assert!(rescanner.queue().is_empty());
        assert!(store.get(&app).is_some());
    }

    #[tokio::test]
    async fn test_invalid_root_is_dropped() {
        let (_dir, app, orchestrator) = setup();
        let mut rescanner = Rescanner::new(orchestrator, Duration::from_millis(10));
        rescanner.enqueue(&change(&app.join("gone/project")));
        assert_eq!(rescanner.drain().await, 0);
        assert!(rescanner.queue().is_empty());
    }
}
