//! Debounced watching of project directories.
//!
//! [`ProjectWatcher`] runs a `notify` debouncer on a blocking task, one
//! recursive watch per project root. Each debounced burst is filtered,
//! grouped by owning project and forwarded as [`ProjectChange`]s over a
//! tokio channel.
//!
//! ```text
//! notify ──▶ debouncer (debounce_ms) ──▶ ChangeFilter ──▶ ProjectIndex::group
//!                                                               │ blocking_send
//!                                                               ▼
//!                                                   mpsc::Receiver<ProjectChange>
//! ```

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use prj_core::WatchConfig;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::WatchError;
use crate::events::{ProjectChange, ProjectIndex};
use crate::filter::ChangeFilter;

/// Capacity of the change channel.
const CHANNEL_CAPACITY: usize = 64;

/// Streams debounced project changes to async code.
///
/// Dropping the watcher stops the blocking task.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8PathBuf;
/// use prj_core::WatchConfig;
/// use prj_watcher::{ProjectFilter, ProjectWatcher};
///
/// # async fn example() -> Result<(), prj_watcher::WatchError> {
/// let projects = vec![Utf8PathBuf::from("/home/me/src/app")];
/// let mut watcher =
///     ProjectWatcher::new(projects, &WatchConfig::default(), ProjectFilter::default())?;
///
/// while let Some(change) = watcher.recv().await {
///     println!("{} changed ({} paths)", change.project, change.paths.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ProjectWatcher {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), WatchError>>>,
    changes: mpsc::Receiver<ProjectChange>,
    index: ProjectIndex,
}

impl std::fmt::Debug for ProjectWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectWatcher")
            .field("projects", &self.index.len())
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl ProjectWatcher {
    /// Starts watching every existing directory in `projects`.
    ///
    /// Missing directories are skipped with a warning. Must be called from
    /// within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::NothingToWatch`] if none of the projects
    /// exists.
    pub fn new<F, I>(projects: I, config: &WatchConfig, filter: F) -> Result<Self, WatchError>
    where
        F: ChangeFilter,
        I: IntoIterator<Item = Utf8PathBuf>,
    {
        let index: ProjectIndex = projects
            .into_iter()
            .filter(|project| {
                let exists = project.is_dir();
                if !exists {
                    warn!(project = %project, "Not watching missing project directory");
                }
                exists
            })
            .collect();
        if index.is_empty() {
            return Err(WatchError::NothingToWatch);
        }

        let (change_tx, changes) = mpsc::channel(CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let debounce = Duration::from_millis(config.debounce_ms);
        let task_index = index.clone();

        let task = tokio::task::spawn_blocking(move || {
            run_watcher_loop(task_index, debounce, change_tx, shutdown_rx, filter)
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
            changes,
            index,
        })
    }

    /// Next change, or `None` once the watcher stopped.
    pub async fn recv(&mut self) -> Option<ProjectChange> {
        self.changes.recv().await
    }

    /// The change channel, for use in `tokio::select!`.
    pub fn changes(&mut self) -> &mut mpsc::Receiver<ProjectChange> {
        &mut self.changes
    }

    /// The watched project roots.
    #[must_use]
    pub const fn projects(&self) -> &ProjectIndex {
        &self.index
    }

    /// Returns `true` while the blocking task runs.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.task.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the watcher and waits for the blocking task.
    ///
    /// # Errors
    ///
    /// Returns the task's own error, or [`WatchError::Task`] if it
    /// panicked.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.await.map_err(|e| WatchError::Task(e.to_string()))??;
        }
        Ok(())
    }
}

impl Drop for ProjectWatcher {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn utf8_paths(events: Vec<notify_debouncer_mini::DebouncedEvent>) -> Vec<Utf8PathBuf> {
    events
        .into_iter()
        .filter_map(|event| match Utf8PathBuf::try_from(event.path) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(path = %e.into_path_buf().display(), "Skipping non-UTF-8 change path");
                None
            }
        })
        .collect()
}

fn forward<F: ChangeFilter>(
    index: &ProjectIndex,
    filter: &F,
    paths: Vec<Utf8PathBuf>,
) -> Vec<ProjectChange> {
    let relevant = paths.into_iter().filter(|path| {
        let keep = index
            .owner(path)
            .is_some_and(|project| filter.should_process(project, path));
        if !keep {
            trace!(path = %path, "Filtered out change");
        }
        keep
    });
    index.group(relevant)
}

#[allow(clippy::needless_pass_by_value)] // Owned for the blocking task's lifetime
fn run_watcher_loop<F: ChangeFilter>(
    index: ProjectIndex,
    debounce: Duration,
    change_tx: mpsc::Sender<ProjectChange>,
    shutdown_rx: oneshot::Receiver<()>,
    filter: F,
) -> Result<(), WatchError> {
    let callback_index = index.clone();
    let mut debouncer = new_debouncer(debounce, move |res: DebounceEventResult| match res {
        Ok(events) => {
            for change in forward(&callback_index, &filter, utf8_paths(events)) {
                debug!(project = %change.project, paths = change.paths.len(), "Project changed");
                if change_tx.blocking_send(change).is_err() {
                    debug!("Change channel closed");
                    break;
                }
            }
        }
        Err(error) => warn!(error = %error, "Debouncer error"),
    })?;

    for project in index.iter() {
        watch(&mut debouncer, project)?;
    }
    info!(projects = index.len(), debounce = ?debounce, "Project watcher started");

    let _ = shutdown_rx.blocking_recv();

    info!("Project watcher stopped");
    Ok(())
}

fn watch(
    debouncer: &mut notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    project: &Utf8Path,
) -> Result<(), WatchError> {
    debouncer
        .watcher()
        .watch(project.as_std_path(), RecursiveMode::Recursive)
        .map_err(WatchError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AcceptAllFilter, ProjectFilter};
    use std::fs;
    use tempfile::TempDir;

    fn project_dir() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().canonicalize().unwrap()).unwrap();
        let app = root.join("app");
        fs::create_dir_all(&app).unwrap();
        (dir, app)
    }

    #[test]
    fn test_forward_applies_filter() {
        let index: ProjectIndex = ["/src/app"].into_iter().collect();
        let changes = forward(
            &index,
            &ProjectFilter::default(),
            ["/src/app/main.py", "/src/app/.git/HEAD", "/src/other.py"]
                .map(Utf8PathBuf::from)
                .to_vec(),
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].paths, vec!["/src/app/main.py"]);
    }

    #[tokio::test]
    async fn test_missing_projects_rejected() {
        let result = ProjectWatcher::new(
            vec![Utf8PathBuf::from("/definitely/not/here")],
            &WatchConfig::default(),
            AcceptAllFilter,
        );
        assert!(matches!(result, Err(WatchError::NothingToWatch)));
    }

    #[tokio::test]
    async fn test_watcher_starts_and_shuts_down() {
        let (_dir, app) = project_dir();
        let watcher = ProjectWatcher::new(
            vec![app.clone(), app.join("missing")],
            &WatchConfig::default(),
            AcceptAllFilter,
        )
        .unwrap();
        assert_eq!(watcher.projects().len(), 1);
        assert!(watcher.is_running());
        watcher.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_watcher_reports_change() {
        let (_dir, app) = project_dir();
        let config = WatchConfig {
            debounce_ms: 100,
            ..WatchConfig::default()
        };
        let mut watcher = ProjectWatcher::new(vec![app.clone()], &config, AcceptAllFilter).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(app.join("main.py"), "print('hi')\n").unwrap();
        let change = tokio::time::timeout(Duration::from_secs(5), watcher.recv()).await;
        watcher.shutdown().await.unwrap();

        // Event delivery depends on the platform backend.
        if let Ok(Some(change)) = change {
            assert_eq!(change.project, app);
        }
    }
}
