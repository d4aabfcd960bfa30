//! Lazy traversal of a scan root.
//!
//! [`DirectoryWalker`] is an explicit work-stack iterator over candidate
//! project directories. It classifies each directory it pops; a project is
//! yielded and treated as a leaf, anything else has its children pushed.
//!
//! # Guarantees
//!
//! - Finite and non-restartable: once exhausted or cancelled it stays empty
//! - A canonical real path is visited at most once per walk, so link loops
//!   terminate
//! - Excluded directories (VCS internals, installed dependencies, build
//!   output) are never entered
//! - Children are visited in name order, so the sequence is deterministic
//! - Cancellation is checked at every pop
//!
//! The root itself is never classified; discovery starts with its children.
//! [`DirectoryWalker::next_step`] also reports directories that were
//! visited without being projects, so a caller can act between projects.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use camino::Utf8Path;
//! use prj_core::ScanConfig;
//! use prj_scanner::{DirectoryWalker, ScanStats};
//! use tokio_util::sync::CancellationToken;
//!
//! let root = prj_scanner::walker::validate_root(Utf8Path::new("/home/me/src"))?;
//! let walker = DirectoryWalker::new(
//!     &root,
//!     &ScanConfig::default(),
//!     CancellationToken::new(),
//!     Arc::new(ScanStats::new()),
//! );
//!
//! for candidate in walker {
//!     println!("{} ({:?})", candidate.path, candidate.classification.language);
//! }
//! # Ok::<(), prj_scanner::ScanError>(())
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use prj_core::ScanConfig;
use rustc_hash::FxHashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::classifier::{Classification, PathClassifier};
use crate::error::{Diagnostic, DiagnosticKind, ScanError};
use crate::filter::DirFilter;
use crate::stats::ScanStats;

/// A directory classified as a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Canonical path of the project.
    pub path: Utf8PathBuf,
    /// Distance from the scan root.
    pub depth: usize,
    /// Classifier output.
    pub classification: Classification,
}

/// One unit of progress of a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkStep {
    /// A project root was found.
    Project(Candidate),
    /// A non-project directory was visited.
    Visited(Utf8PathBuf),
}

/// Canonicalises a requested scan root.
///
/// # Errors
///
/// Returns [`ScanError::InvalidRoot`] if the path does not exist, is not a
/// directory, or does not canonicalise to UTF-8.
pub fn validate_root(root: &Utf8Path) -> Result<Utf8PathBuf, ScanError> {
    let canonical = fs::canonicalize(root)
        .map_err(|e| ScanError::invalid_root(root, format!("does not exist ({e})")))?;
    if !canonical.is_dir() {
        return Err(ScanError::invalid_root(root, "not a directory"));
    }
    Utf8PathBuf::from_path_buf(canonical)
        .map_err(|_| ScanError::invalid_root(root, "path is not valid UTF-8"))
}

/// Work-stack iterator over candidate project directories.
#[derive(Debug)]
pub struct DirectoryWalker {
    classifier: PathClassifier,
    filter: DirFilter,
    max_depth: usize,
    follow_links: bool,
    cancel: CancellationToken,
    stats: Arc<ScanStats>,
    stack: Vec<(Utf8PathBuf, usize)>,
    visited: FxHashSet<PathBuf>,
    diagnostics: Vec<Diagnostic>,
}

impl DirectoryWalker {
    /// Creates a walker rooted at `root`, which should already be
    /// validated with [`validate_root`].
    #[must_use]
    pub fn new(
        root: &Utf8Path,
        config: &ScanConfig,
        cancel: CancellationToken,
        stats: Arc<ScanStats>,
    ) -> Self {
        let filter = DirFilter::new()
            .with_skip_dirs(&config.skip_dirs)
            .with_include_hidden(config.include_hidden);
        Self {
            classifier: PathClassifier::new(filter.clone(), config.language_sample_depth),
            filter,
            max_depth: config.max_depth,
            follow_links: config.follow_links,
            cancel,
            stats,
            stack: vec![(root.to_owned(), 0)],
            visited: FxHashSet::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Diagnostics recorded so far.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Takes the diagnostics recorded so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn record(&mut self, path: &Utf8Path, kind: DiagnosticKind, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(path.as_str(), kind, message);
        warn!(%diagnostic, "Skipping path");
        self.stats.increment_errors();
        self.diagnostics.push(diagnostic);
    }

    /// Pushes the walkable children of `dir` so that they pop in name order.
    fn push_children(&mut self, dir: &Utf8Path, depth: usize) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.record(dir, DiagnosticKind::Unreadable, e.to_string());
                return;
            }
        };

        let mut children: Vec<Utf8PathBuf> = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.record(dir, DiagnosticKind::Unreadable, e.to_string());
                    continue;
                }
            };
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let is_dir = if file_type.is_symlink() {
                self.follow_links && entry.path().is_dir()
            } else {
                file_type.is_dir()
            };
            if !is_dir {
                continue;
            }

            let Ok(name) = entry.file_name().into_string() else {
                let lossy = entry.path().to_string_lossy().into_owned();
                self.record(
                    Utf8Path::new(&lossy),
                    DiagnosticKind::NonUtf8,
                    "directory name is not valid UTF-8",
                );
                continue;
            };
            if self.filter.is_excluded(&name) {
                self.stats.increment_skipped();
                continue;
            }
            children.push(dir.join(name));
        }

        children.sort();
        self.stack
            .extend(children.into_iter().rev().map(|child| (child, depth)));
    }
}

impl DirectoryWalker {
    /// Advances to the next visited directory, project or not.
    pub fn next_step(&mut self) -> Option<WalkStep> {
        while let Some((dir, depth)) = self.stack.pop() {
            if self.cancel.is_cancelled() {
                debug!(pending = self.stack.len(), "Walk cancelled");
                self.stack.clear();
                return None;
            }

            let canonical = match fs::canonicalize(&dir) {
                Ok(canonical) => canonical,
                Err(e) => {
                    self.record(&dir, DiagnosticKind::Unreadable, e.to_string());
                    continue;
                }
            };
            if !self.visited.insert(canonical.clone()) {
                self.record(&dir, DiagnosticKind::SymlinkLoop, "already visited");
                continue;
            }
            self.stats.increment_dirs_visited();

            if depth > 0 {
                match self.classifier.classify(&dir) {
                    Ok(classification) if classification.is_project => {
                        self.stats.increment_projects_found();
                        let path = Utf8PathBuf::from_path_buf(canonical).unwrap_or(dir);
                        return Some(WalkStep::Project(Candidate {
                            path,
                            depth,
                            classification,
                        }));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.record(&dir, DiagnosticKind::Unreadable, e.to_string());
                        continue;
                    }
                }
            }

            if depth < self.max_depth {
                self.push_children(&dir, depth + 1);
            } else {
                self.stats.increment_skipped();
            }
            return Some(WalkStep::Visited(dir));
        }
        None
    }
}

impl Iterator for DirectoryWalker {
    type Item = Candidate;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.next_step()? {
                WalkStep::Project(candidate) => return Some(candidate),
                WalkStep::Visited(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prj_core::Language;
    use tempfile::TempDir;

    fn tree(files: &[&str]) -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "").unwrap();
        }
        let root = validate_root(&root).unwrap();
        (dir, root)
    }

    fn walk(root: &Utf8Path, config: &ScanConfig) -> Vec<Candidate> {
        DirectoryWalker::new(
            root,
            config,
            CancellationToken::new(),
            Arc::new(ScanStats::new()),
        )
        .collect()
    }

    fn names(candidates: &[Candidate], root: &Utf8Path) -> Vec<String> {
        candidates
            .iter()
            .map(|c| c.path.strip_prefix(root).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_projects_are_leaves() {
        let (_dir, root) = tree(&[
            "proj-a/Cargo.toml",
            "proj-a/nested/package.json",
            "group/proj-b/main.py",
            "docs/notes.txt",
        ]);
        let found = walk(&root, &ScanConfig::default());
        assert_eq!(names(&found, &root), vec!["group/proj-b", "proj-a"]);
        assert_eq!(found[1].classification.language, Some(Language::Rust));
    }

    #[test]
    fn test_excluded_dirs_not_entered() {
        let (_dir, root) = tree(&["node_modules/lib/index.js", "app/main.go"]);
        let found = walk(&root, &ScanConfig::default());
        assert_eq!(names(&found, &root), vec!["app"]);
    }

    #[test]
    fn test_max_depth() {
        let (_dir, root) = tree(&["a/b/c/main.rs"]);
        let config = ScanConfig {
            max_depth: 2,
            ..ScanConfig::default()
        };
        assert!(walk(&root, &config).is_empty());

        let config = ScanConfig {
            max_depth: 3,
            ..ScanConfig::default()
        };
        assert_eq!(names(&walk(&root, &config), &root), vec!["a/b/c"]);
    }

    #[test]
    fn test_root_is_not_classified() {
        let (_dir, root) = tree(&["Cargo.toml", "sub/main.py"]);
        let found = walk(&root, &ScanConfig::default());
        assert_eq!(names(&found, &root), vec!["sub"]);
    }

    #[test]
    fn test_cancelled_walk_is_empty() {
        let (_dir, root) = tree(&["a/main.rs", "b/main.rs"]);
        let cancel = CancellationToken::new();
        let mut walker = DirectoryWalker::new(
            &root,
            &ScanConfig::default(),
            cancel.clone(),
            Arc::new(ScanStats::new()),
        );
        assert!(walker.next().is_some());
        cancel.cancel();
        assert!(walker.next().is_none());
        assert!(walker.next().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_terminates() {
        let (_dir, root) = tree(&["outer/inner/readme.txt"]);
        std::os::unix::fs::symlink(root.join("outer"), root.join("outer/inner/back")).unwrap();

        let config = ScanConfig {
            follow_links: true,
            max_depth: 10,
            ..ScanConfig::default()
        };
        let stats = Arc::new(ScanStats::new());
        let mut walker =
            DirectoryWalker::new(&root, &config, CancellationToken::new(), Arc::clone(&stats));
        assert_eq!(walker.by_ref().count(), 0);
        assert!(walker
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::SymlinkLoop));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_dir_recorded_and_not_entered() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, root) = tree(&["locked/inner/main.py", "open/main.py"]);
        let locked = root.join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Privileged users read through the mode bits.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let stats = Arc::new(ScanStats::new());
        let mut walker = DirectoryWalker::new(
            &root,
            &ScanConfig::default(),
            CancellationToken::new(),
            Arc::clone(&stats),
        );
        let found: Vec<Candidate> = walker.by_ref().collect();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(names(&found, &root), vec!["open"]);
        let diagnostics = walker.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Unreadable);
        assert_eq!(diagnostics[0].path, locked.as_str());
        assert_eq!(stats.snapshot().errors, 1);
    }

    #[test]
    fn test_steps_report_plain_directories() {
        let (_dir, root) = tree(&["docs/notes.txt", "docs/more/notes.txt", "app/main.go"]);
        let mut walker = DirectoryWalker::new(
            &root,
            &ScanConfig::default(),
            CancellationToken::new(),
            Arc::new(ScanStats::new()),
        );
        let steps: Vec<WalkStep> = std::iter::from_fn(|| walker.next_step()).collect();

        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0], WalkStep::Visited(root.clone()));
        assert!(matches!(&steps[1], WalkStep::Project(c) if c.path == root.join("app")));
        assert_eq!(steps[2], WalkStep::Visited(root.join("docs")));
        assert_eq!(steps[3], WalkStep::Visited(root.join("docs/more")));
    }

    #[test]
    fn test_validate_root_rejects_files() {
        let (_dir, root) = tree(&["file.txt"]);
        let err = validate_root(&root.join("file.txt")).unwrap_err();
        assert!(matches!(err, ScanError::InvalidRoot { .. }));
        assert!(validate_root(Utf8Path::new("/no/such/root")).is_err());
    }
}
