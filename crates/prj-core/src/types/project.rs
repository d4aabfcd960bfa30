//! Project records.
//!
//! A [`ProjectRecord`] is identified by its canonical absolute path and is
//! split into two views:
//!
//! - [`ScanFacts`] - ground truth recomputed from disk on every scan
//! - [`UserAnnotations`] - category, tags, notes and favourite flag, set
//!   only by explicit user edits
//!
//! A rescan replaces `scan` wholesale and never touches `user`.

use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::{Language, ProjectVersion, DEFAULT_CATEGORY};

/// Normalised dependency names declared by a project's manifests.
///
/// # Examples
///
/// ```
/// use prj_core::DependencySummary;
///
/// let deps = DependencySummary::from_names(["serde", "anyhow", "serde"]);
/// assert_eq!(deps.count, 2);
/// assert_eq!(deps.entries, vec!["anyhow", "serde"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencySummary {
    /// Number of unique dependency names.
    pub count: usize,
    /// Unique dependency names, sorted.
    pub entries: Vec<String>,
}

impl DependencySummary {
    /// Builds a summary from raw names, deduplicating and sorting them.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries: Vec<String> = names
            .into_iter()
            .map(Into::into)
            .filter(|n| !n.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self {
            count: entries.len(),
            entries,
        }
    }

    /// Returns `true` if no dependencies were found.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fields recomputed from disk on every scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanFacts {
    /// Primary language; `None` means unknown.
    pub language: Option<Language>,
    /// Declared version, if a version file was found.
    pub version: Option<ProjectVersion>,
    /// Recursive byte total, excluding VCS and dependency directories.
    pub size: u64,
    /// Latest modification time of tracked files, in Unix seconds.
    pub modified: u64,
    /// A version-control marker directory exists.
    pub has_vcs: bool,
    /// A readme file exists at the top level.
    pub has_readme: bool,
    /// A dependency manifest exists at the top level.
    pub has_manifest: bool,
    /// First line of the readme, trimmed.
    pub description: Option<String>,
    /// Entry-point file found at the top level.
    pub main_file: Option<String>,
    /// Declared dependencies.
    pub dependencies: DependencySummary,
}

/// Fields owned by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAnnotations {
    /// Category key.
    pub category: String,
    /// Normalised tags.
    pub tags: BTreeSet<String>,
    /// Free-text notes.
    pub notes: String,
    /// Favourite flag.
    pub favorite: bool,
}

impl Default for UserAnnotations {
    fn default() -> Self {
        Self {
            category: DEFAULT_CATEGORY.to_owned(),
            tags: BTreeSet::new(),
            notes: String::new(),
            favorite: false,
        }
    }
}

impl UserAnnotations {
    /// Returns `true` if nothing differs from a freshly discovered record.
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// A discovered project.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use prj_core::{ProjectRecord, ScanFacts};
///
/// let record = ProjectRecord::new(Utf8PathBuf::from("/src/proj-a"), ScanFacts::default());
/// assert_eq!(record.name, "proj-a");
/// assert_eq!(record.user.category, "uncategorized");
/// assert_eq!(record.language_label(), "Unknown");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Canonical absolute path; the identity key.
    pub path: Utf8PathBuf,
    /// Final path segment.
    pub name: String,
    /// Scan-derived fields.
    #[serde(flatten)]
    pub scan: ScanFacts,
    /// User fields.
    #[serde(flatten)]
    pub user: UserAnnotations,
}

impl ProjectRecord {
    /// Creates a record for a newly discovered project with default user
    /// fields.
    #[must_use]
    pub fn new(path: Utf8PathBuf, scan: ScanFacts) -> Self {
        let name = name_from_path(&path);
        Self {
            path,
            name,
            scan,
            user: UserAnnotations::default(),
        }
    }

    /// Replaces the scan-derived fields, keeping the user fields.
    pub fn refresh(&mut self, fresh: &ScanFacts) {
        self.name = name_from_path(&self.path);
        self.scan.clone_from(fresh);
    }

    /// Display label of the primary language.
    #[must_use]
    pub fn language_label(&self) -> &'static str {
        self.scan.language.map_or("Unknown", Language::label)
    }

    /// Returns `true` if this record lies strictly beneath `root`.
    #[must_use]
    pub fn is_under(&self, root: &Utf8Path) -> bool {
        self.path.as_path() != root && self.path.starts_with(root)
    }

    /// Case-insensitive match against name, path and description.
    #[must_use]
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.path.as_str().to_lowercase().contains(&needle)
            || self
                .scan
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }
}

fn name_from_path(path: &Utf8Path) -> String {
    path.file_name().unwrap_or(path.as_str()).to_owned()
}
