//! Error types for the prj-watcher crate.

/// Errors raised while setting up or running the project watcher.
///
/// Per-project problems (a project directory that vanished, a non-UTF-8
/// event path) are logged and skipped; only the variants here stop the
/// watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The notify backend failed to start or to add a watch.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// None of the requested project directories exists.
    #[error("no existing project directory to watch")]
    NothingToWatch,

    /// The blocking watcher task panicked or was aborted.
    #[error("watcher task failed: {0}")]
    Task(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            WatchError::NothingToWatch.to_string(),
            "no existing project directory to watch"
        );
        assert_eq!(
            WatchError::Task("cancelled".into()).to_string(),
            "watcher task failed: cancelled"
        );
    }
}
