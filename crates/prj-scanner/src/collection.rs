//! The project collection and its merge algorithm.
//!
//! [`Collection`] is keyed by canonical path. [`Collection::merge`] is a
//! field-level upsert: a fresh record refreshes the scan-derived fields of
//! an existing one and never touches its user fields. Merging the same
//! batch twice is the same as merging it once.
//!
//! [`Collection::reconcile_scan`] is what a completed scan commits: merge,
//! then drop every record strictly beneath the scan root that the scan did
//! not revisit. Records outside the root are left alone, so overlapping
//! roots never lose each other's projects.

use std::collections::{BTreeMap, BTreeSet};

use camino::{Utf8Path, Utf8PathBuf};
use prj_core::{Language, ProjectRecord};
use serde::{Deserialize, Serialize};

/// Counts produced by a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    /// Records inserted with default user fields.
    pub added: usize,
    /// Existing records whose scan fields were refreshed.
    pub updated: usize,
    /// Records pruned because their path was not revisited.
    pub removed: usize,
}

/// Aggregate figures for a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    /// Number of projects.
    pub total: usize,
    /// Sum of project sizes in bytes.
    pub total_size: u64,
    /// Projects with a VCS marker.
    pub with_vcs: usize,
    /// Projects marked favourite.
    pub favorites: usize,
    /// Project count per language label.
    pub by_language: BTreeMap<String, usize>,
}

/// The set of known projects, ordered by path.
///
/// # Examples
///
/// ```
/// use camino::{Utf8Path, Utf8PathBuf};
/// use prj_core::{ProjectRecord, ScanFacts};
/// use prj_scanner::Collection;
///
/// let mut collection = Collection::new();
/// let fresh = vec![ProjectRecord::new(Utf8PathBuf::from("/src/a"), ScanFacts::default())];
///
/// let first = collection.merge(fresh.clone());
/// let second = collection.merge(fresh);
/// assert_eq!(first.added, 1);
/// assert_eq!(second.added, 0);
/// assert_eq!(collection.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    records: BTreeMap<Utf8PathBuf, ProjectRecord>,
}

impl Collection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up a record by path.
    #[must_use]
    pub fn get(&self, path: &Utf8Path) -> Option<&ProjectRecord> {
        self.records.get(path)
    }

    /// Mutable lookup by path.
    pub fn get_mut(&mut self, path: &Utf8Path) -> Option<&mut ProjectRecord> {
        self.records.get_mut(path)
    }

    /// Removes a record.
    pub fn remove(&mut self, path: &Utf8Path) -> Option<ProjectRecord> {
        self.records.remove(path)
    }

    /// Records in path order.
    pub fn iter(&self) -> impl Iterator<Item = &ProjectRecord> {
        self.records.values()
    }

    /// Mutable records in path order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ProjectRecord> {
        self.records.values_mut()
    }

    /// Consumes the collection, returning records in path order.
    #[must_use]
    pub fn into_records(self) -> Vec<ProjectRecord> {
        self.records.into_values().collect()
    }

    /// Upserts fresh records, preserving user fields of existing ones.
    pub fn merge<I>(&mut self, fresh: I) -> MergeSummary
    where
        I: IntoIterator<Item = ProjectRecord>,
    {
        let mut summary = MergeSummary::default();
        for record in fresh {
            match self.records.get_mut(&record.path) {
                Some(existing) => {
                    existing.refresh(&record.scan);
                    summary.updated += 1;
                }
                None => {
                    self.records.insert(record.path.clone(), record);
                    summary.added += 1;
                }
            }
        }
        summary
    }

    /// Removes records strictly beneath `root` whose path is not in
    /// `visited`. Returns how many were removed.
    pub fn prune(&mut self, root: &Utf8Path, visited: &BTreeSet<Utf8PathBuf>) -> usize {
        let before = self.records.len();
        self.records
            .retain(|path, record| !record.is_under(root) || visited.contains(path));
        before - self.records.len()
    }

    /// Merges the complete result of a scan of `root` and prunes what it
    /// no longer found.
    pub fn reconcile_scan(&mut self, root: &Utf8Path, fresh: Vec<ProjectRecord>) -> MergeSummary {
        let visited: BTreeSet<Utf8PathBuf> = fresh.iter().map(|r| r.path.clone()).collect();
        let mut summary = self.merge(fresh);
        summary.removed = self.prune(root, &visited);
        summary
    }

    /// Records matching a text filter and an optional language.
    #[must_use]
    pub fn filter(&self, text: Option<&str>, language: Option<Language>) -> Vec<&ProjectRecord> {
        self.iter()
            .filter(|r| text.is_none_or(|t| t.is_empty() || r.matches_text(t)))
            .filter(|r| language.is_none_or(|l| r.scan.language == Some(l)))
            .collect()
    }

    /// Distinct language labels present, sorted.
    #[must_use]
    pub fn languages(&self) -> Vec<&'static str> {
        self.iter()
            .map(ProjectRecord::language_label)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Favourite records.
    #[must_use]
    pub fn favorites(&self) -> Vec<&ProjectRecord> {
        self.iter().filter(|r| r.user.favorite).collect()
    }

    /// Records carrying any (or, with `match_all`, every) of `tags`.
    #[must_use]
    pub fn by_tags(&self, tags: &[String], match_all: bool) -> Vec<&ProjectRecord> {
        if tags.is_empty() {
            return Vec::new();
        }
        self.iter()
            .filter(|r| {
                if match_all {
                    tags.iter().all(|t| r.user.tags.contains(t))
                } else {
                    tags.iter().any(|t| r.user.tags.contains(t))
                }
            })
            .collect()
    }

    /// Records in `category`.
    #[must_use]
    pub fn by_category(&self, category: &str) -> Vec<&ProjectRecord> {
        self.iter().filter(|r| r.user.category == category).collect()
    }

    /// Records whose notes contain `query`, case-insensitively.
    #[must_use]
    pub fn search_notes(&self, query: &str) -> Vec<&ProjectRecord> {
        let query = query.to_lowercase();
        self.iter()
            .filter(|r| !r.user.notes.is_empty() && r.user.notes.to_lowercase().contains(&query))
            .collect()
    }

    /// Number of records per tag.
    #[must_use]
    pub fn tag_statistics(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for tag in self.iter().flat_map(|r| r.user.tags.iter()) {
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Aggregate figures.
    #[must_use]
    pub fn summary(&self) -> CollectionSummary {
        let mut summary = CollectionSummary {
            total: self.len(),
            ..CollectionSummary::default()
        };
        for record in self.iter() {
            summary.total_size = summary.total_size.saturating_add(record.scan.size);
            summary.with_vcs += usize::from(record.scan.has_vcs);
            summary.favorites += usize::from(record.user.favorite);
            *summary
                .by_language
                .entry(record.language_label().to_owned())
                .or_insert(0) += 1;
        }
        summary
    }
}

impl FromIterator<ProjectRecord> for Collection {
    fn from_iter<I: IntoIterator<Item = ProjectRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().map(|r| (r.path.clone(), r)).collect(),
        }
    }
}
