//! Filtering of change events before they reach the rescan queue.
//!
//! A change only matters if it could alter what a scan records about the
//! project. Writes inside installed dependencies, build output and VCS
//! internals do not, and neither do compiled Python files. The cache's own
//! data directory is always ignored so a save never triggers a rescan.
//!
//! # Examples
//!
//! ```
//! use camino::Utf8Path;
//! use prj_watcher::{ChangeFilter, ProjectFilter};
//!
//! let filter = ProjectFilter::new(&["scratch"]);
//! let project = Utf8Path::new("/src/app");
//!
//! assert!(filter.should_process(project, Utf8Path::new("/src/app/src/main.rs")));
//! assert!(!filter.should_process(project, Utf8Path::new("/src/app/target/debug/app")));
//! assert!(!filter.should_process(project, Utf8Path::new("/src/app/scratch/notes.md")));
//! assert!(!filter.should_process(project, Utf8Path::new("/src/app/mod.pyc")));
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use prj_scanner::{registry, DirFilter};

/// File suffixes that never trigger a rescan.
const IGNORED_SUFFIXES: &[&str] = &["pyc", "pyo", "pyd"];

/// Decides whether a changed path should schedule a rescan of the project
/// that contains it.
///
/// Filters run on the blocking watcher thread, hence the bounds.
pub trait ChangeFilter: Send + Sync + 'static {
    /// Returns `true` if a change to `path` inside `project` matters.
    fn should_process(&self, project: &Utf8Path, path: &Utf8Path) -> bool;
}

/// Accepts every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl ChangeFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _project: &Utf8Path, _path: &Utf8Path) -> bool {
        true
    }
}

/// The watcher's default filter: the scanner's directory exclusions plus
/// extra names, compiled-file suffixes and ignored path prefixes.
#[derive(Debug, Clone)]
pub struct ProjectFilter {
    dirs: DirFilter,
    ignored_prefixes: Vec<Utf8PathBuf>,
}

impl Default for ProjectFilter {
    fn default() -> Self {
        Self::new::<&str>(&[])
    }
}

impl ProjectFilter {
    /// Creates a filter excluding the scanner's directories plus `ignore`.
    #[must_use]
    pub fn new<S: AsRef<str>>(ignore: &[S]) -> Self {
        Self {
            dirs: DirFilter::new().with_skip_dirs(ignore),
            ignored_prefixes: Vec::new(),
        }
    }

    /// Also ignores everything beneath `prefix`.
    #[must_use]
    pub fn ignoring(mut self, prefix: impl Into<Utf8PathBuf>) -> Self {
        self.ignored_prefixes.push(prefix.into());
        self
    }
}

impl ChangeFilter for ProjectFilter {
    fn should_process(&self, project: &Utf8Path, path: &Utf8Path) -> bool {
        if self.ignored_prefixes.iter().any(|p| path.starts_with(p)) {
            return false;
        }
        let Ok(relative) = path.strip_prefix(project) else {
            return false;
        };
        if path
            .extension()
            .is_some_and(|ext| IGNORED_SUFFIXES.contains(&ext))
        {
            return false;
        }

        let mut components = relative.components().peekable();
        while let Some(component) = components.next() {
            let name = component.as_str();
            let is_last = components.peek().is_none();
            let excluded = if is_last {
                registry::is_excluded_dir(name)
            } else {
                self.dirs.is_excluded(name)
            };
            if excluded {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(filter: &ProjectFilter, path: &str) -> bool {
        filter.should_process(Utf8Path::new("/src/app"), Utf8Path::new(path))
    }

    #[test]
    fn test_excluded_dirs_are_relative_to_project() {
        let filter = ProjectFilter::default();
        let project = Utf8Path::new("/home/me/build/app");
        assert!(filter.should_process(project, Utf8Path::new("/home/me/build/app/main.go")));
        assert!(!filter.should_process(project, Utf8Path::new("/home/me/build/app/build/out.o")));
    }

    #[test]
    fn test_vcs_and_dependencies_ignored() {
        let filter = ProjectFilter::default();
        assert!(!check(&filter, "/src/app/.git/index"));
        assert!(!check(&filter, "/src/app/.git"));
        assert!(!check(&filter, "/src/app/node_modules/left-pad/index.js"));
        assert!(!check(&filter, "/src/app/__pycache__/x.cpython-312.pyc"));
        assert!(check(&filter, "/src/app/package.json"));
        assert!(check(&filter, "/src/app/.gitignore"));
    }

    #[test]
    fn test_ignored_prefix_and_foreign_paths() {
        let filter = ProjectFilter::default().ignoring("/src/app/data");
        assert!(!check(&filter, "/src/app/data/projects.json"));
        assert!(!check(&filter, "/elsewhere/file.rs"));
        assert!(check(&filter, "/src/app/src/lib.rs"));
    }

    #[test]
    fn test_extra_names() {
        let filter = ProjectFilter::new(&[".idea"]);
        assert!(!check(&filter, "/src/app/.idea/workspace.xml"));
        assert!(AcceptAllFilter.should_process(Utf8Path::new("/a"), Utf8Path::new("/b")));
    }
}
