//! Directory exclusion rules.
//!
//! [`DirFilter`] decides which directories are pruned, both by the
//! top-level [`DirectoryWalker`](crate::DirectoryWalker) and by the
//! in-project walks that count extensions, sum sizes and look for version
//! files. The built-in set covers VCS internals, installed dependencies and
//! build output; callers add names with [`DirFilter::with_skip_dirs`].
//!
//! # Examples
//!
//! ```
//! use prj_scanner::DirFilter;
//!
//! let filter = DirFilter::new().with_skip_dirs(&["scratch"]);
//! assert!(filter.is_excluded("node_modules"));
//! assert!(filter.is_excluded("scratch"));
//! assert!(filter.is_excluded(".cache"));
//! assert!(!filter.is_excluded("src"));
//! ```

use std::sync::Arc;

use camino::Utf8Path;
use ignore::WalkBuilder;
use rustc_hash::FxHashSet;

use crate::registry;

/// Exclusion rules shared by every walk in a scan.
///
/// Cloning is cheap; the user-supplied names live behind an [`Arc`].
#[derive(Debug, Clone, Default)]
pub struct DirFilter {
    /// Names added on top of [`registry::EXCLUDED_DIRS`].
    extra: Arc<FxHashSet<String>>,
    /// Whether dot-directories are walked.
    include_hidden: bool,
}

impl DirFilter {
    /// Creates a filter with only the built-in exclusions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds directory names to exclude.
    #[must_use]
    pub fn with_skip_dirs<S: AsRef<str>>(mut self, dirs: &[S]) -> Self {
        let mut extra: FxHashSet<String> = (*self.extra).clone();
        extra.extend(dirs.iter().map(|d| d.as_ref().to_owned()));
        self.extra = Arc::new(extra);
        self
    }

    /// Configures whether dot-directories are walked.
    ///
    /// VCS markers stay excluded either way.
    #[must_use]
    pub const fn with_include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Returns `true` if a directory called `name` must not be entered.
    #[must_use]
    pub fn is_excluded(&self, name: &str) -> bool {
        registry::is_excluded_dir(name)
            || self.extra.contains(name)
            || (!self.include_hidden && name.starts_with('.') && name.len() > 1)
    }

    /// Builds a single-threaded walk of a project tree that prunes excluded
    /// directories and does not follow links.
    ///
    /// `max_depth` counts from `root` (depth 0); `None` walks the whole
    /// tree. Gitignore rules are not consulted: a project's size and
    /// language are properties of what is on disk.
    #[must_use]
    pub fn project_walk(&self, root: &Utf8Path, max_depth: Option<usize>) -> ignore::Walk {
        let filter = self.clone();
        WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(false)
            .max_depth(max_depth)
            .threads(1)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                if !is_dir || entry.depth() == 0 {
                    return true;
                }
                entry
                    .file_name()
                    .to_str()
                    .is_none_or(|name| !filter.is_excluded(name))
            })
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_hidden_dirs() {
        let filter = DirFilter::new();
        assert!(filter.is_excluded(".idea"));
        let filter = filter.with_include_hidden(true);
        assert!(!filter.is_excluded(".idea"));
        assert!(filter.is_excluded(".git"));
    }

    #[test]
    fn test_with_skip_dirs_is_additive() {
        let filter = DirFilter::new()
            .with_skip_dirs(&["a"])
            .with_skip_dirs(&["b".to_owned()]);
        assert!(filter.is_excluded("a"));
        assert!(filter.is_excluded("b"));
    }

    #[test]
    fn test_project_walk_prunes_excluded() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("node_modules/left-pad")).unwrap();
        fs::write(root.join("src/main.js"), "x").unwrap();
        fs::write(root.join("node_modules/left-pad/index.js"), "x").unwrap();

        let files: Vec<String> = DirFilter::new()
            .project_walk(&root, None)
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();

        assert_eq!(files, vec!["main.js"]);
    }
}
