//! On-disk layout of the data directory.
//!
//! The collection lives in `projects.json`. Each user field also has a side
//! table keyed by project path, loaded independently of the collection: a
//! corrupt side table costs only the field it owns, never the listing.
//! Entries for paths the collection does not hold are kept as
//! [`PendingAnnotations`] until a scan rediscovers the path or prunes it.
//!
//! | file | contents |
//! |------|----------|
//! | `projects.json` | [`CollectionFile`] |
//! | `tags.json` | path → tags |
//! | `categories.json` | [`CategoriesFile`] |
//! | `notes.json` | path → note |
//! | `favorites.json` | favourite paths |
//! | `recent_projects.json` | [`RecentEntry`] list, most recent first |
//! | `dependency_cache.json` | path → [`DependencySummary`] |
//! | `dependency_stats.json` | [`DependencyStatistics`] |

use std::collections::{BTreeMap, BTreeSet};

use camino::Utf8PathBuf;
use prj_core::{CategoryDef, DependencySummary, ProjectRecord, UserAnnotations, DEFAULT_CATEGORY};
use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::dependencies::DependencyStatistics;

/// Collection file name.
pub const PROJECTS_FILE: &str = "projects.json";
/// Tag table file name.
pub const TAGS_FILE: &str = "tags.json";
/// Category table file name.
pub const CATEGORIES_FILE: &str = "categories.json";
/// Notes table file name.
pub const NOTES_FILE: &str = "notes.json";
/// Favourites file name.
pub const FAVORITES_FILE: &str = "favorites.json";
/// Recent access file name.
pub const RECENT_FILE: &str = "recent_projects.json";
/// Dependency summary cache file name.
pub const DEPENDENCY_CACHE_FILE: &str = "dependency_cache.json";
/// Dependency statistics file name.
pub const DEPENDENCY_STATS_FILE: &str = "dependency_stats.json";

/// Current `projects.json` format.
pub const FORMAT_VERSION: u32 = 1;

/// Contents of `projects.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionFile {
    /// Layout version.
    pub format: u32,
    /// Records sorted by path.
    pub projects: Vec<ProjectRecord>,
}

/// Path → tags.
pub type TagTable = BTreeMap<Utf8PathBuf, BTreeSet<String>>;

/// Path → note.
pub type NoteTable = BTreeMap<Utf8PathBuf, String>;

/// Favourite paths.
pub type FavoriteTable = BTreeSet<Utf8PathBuf>;

/// User fields of paths missing from the collection.
pub type PendingAnnotations = BTreeMap<Utf8PathBuf, UserAnnotations>;

/// Path → dependency summary.
pub type DependencyCache = BTreeMap<Utf8PathBuf, DependencySummary>;

/// Contents of `categories.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoriesFile {
    /// Path → category key, for non-default categories.
    pub assignments: BTreeMap<Utf8PathBuf, String>,
    /// User-defined categories.
    pub custom: Vec<CategoryDef>,
}

/// One entry of the recent-projects list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEntry {
    /// Project path.
    pub path: Utf8PathBuf,
    /// Project name at access time.
    pub name: String,
    /// Access time, Unix seconds.
    pub accessed: u64,
}

/// Every side table, derived from one collection snapshot.
#[derive(Debug, Clone, Default)]
pub struct SideTables {
    /// Tags of tagged projects.
    pub tags: TagTable,
    /// Category assignments and custom categories.
    pub categories: CategoriesFile,
    /// Non-empty notes.
    pub notes: NoteTable,
    /// Favourite paths.
    pub favorites: FavoriteTable,
    /// Dependency summaries of projects with dependencies.
    pub dependency_cache: DependencyCache,
    /// Collection-wide dependency statistics.
    pub dependency_stats: DependencyStatistics,
}

impl SideTables {
    /// Derives the tables for `collection` plus the `pending` annotations
    /// of paths it does not hold. Only non-default values are stored.
    #[must_use]
    pub fn from_collection(
        collection: &Collection,
        pending: &PendingAnnotations,
        custom: &[CategoryDef],
    ) -> Self {
        let mut tables = Self {
            categories: CategoriesFile {
                custom: custom.to_vec(),
                ..CategoriesFile::default()
            },
            dependency_stats: DependencyStatistics::from_records(collection.iter()),
            ..Self::default()
        };

        for (path, user) in pending {
            tables.insert_user(path, user);
        }
        for record in collection.iter() {
            tables.insert_user(&record.path, &record.user);
            if !record.scan.dependencies.is_empty() {
                tables
                    .dependency_cache
                    .insert(record.path.clone(), record.scan.dependencies.clone());
            }
        }
        tables
    }

    fn insert_user(&mut self, path: &Utf8PathBuf, user: &UserAnnotations) {
        if !user.tags.is_empty() {
            self.tags.insert(path.clone(), user.tags.clone());
        }
        if user.category != DEFAULT_CATEGORY {
            self.categories
                .assignments
                .insert(path.clone(), user.category.clone());
        }
        if !user.notes.is_empty() {
            self.notes.insert(path.clone(), user.notes.clone());
        }
        if user.favorite {
            self.favorites.insert(path.clone());
        }
    }
}

/// The user-field tables read at load time; `None` for a missing or
/// corrupt file.
#[derive(Debug, Clone, Default)]
pub struct UserTables {
    /// `tags.json`.
    pub tags: Option<TagTable>,
    /// `categories.json`.
    pub categories: Option<CategoriesFile>,
    /// `notes.json`.
    pub notes: Option<NoteTable>,
    /// `favorites.json`.
    pub favorites: Option<FavoriteTable>,
}

impl UserTables {
    /// Overlays every loaded table on the collection.
    pub fn overlay(&self, collection: &mut Collection) {
        if let Some(tags) = &self.tags {
            overlay_tags(collection, tags);
        }
        if let Some(categories) = &self.categories {
            overlay_categories(collection, categories);
        }
        if let Some(notes) = &self.notes {
            overlay_notes(collection, notes);
        }
        if let Some(favorites) = &self.favorites {
            overlay_favorites(collection, favorites);
        }
    }

    /// Annotations the tables hold for paths missing from `collection`.
    #[must_use]
    pub fn pending(&self, collection: &Collection) -> PendingAnnotations {
        let mut pending = PendingAnnotations::new();

        for (path, tags) in self.tags.iter().flatten() {
            if let Some(user) = pending_entry(&mut pending, collection, path) {
                user.tags.clone_from(tags);
            }
        }
        for (path, key) in self.categories.iter().flat_map(|c| &c.assignments) {
            if let Some(user) = pending_entry(&mut pending, collection, path) {
                user.category.clone_from(key);
            }
        }
        for (path, note) in self.notes.iter().flatten() {
            if let Some(user) = pending_entry(&mut pending, collection, path) {
                user.notes.clone_from(note);
            }
        }
        for path in self.favorites.iter().flatten() {
            if let Some(user) = pending_entry(&mut pending, collection, path) {
                user.favorite = true;
            }
        }

        pending.retain(|_, user| !user.is_default());
        pending
    }
}

fn pending_entry<'a>(
    pending: &'a mut PendingAnnotations,
    collection: &Collection,
    path: &Utf8PathBuf,
) -> Option<&'a mut UserAnnotations> {
    if collection.get(path).is_some() {
        return None;
    }
    Some(pending.entry(path.clone()).or_default())
}

/// Replaces every record's tags with the table's entry.
pub fn overlay_tags(collection: &mut Collection, table: &TagTable) {
    for record in collection.iter_mut() {
        record.user.tags = table.get(&record.path).cloned().unwrap_or_default();
    }
}

/// Replaces every record's category with the table's assignment.
pub fn overlay_categories(collection: &mut Collection, table: &CategoriesFile) {
    for record in collection.iter_mut() {
        record.user.category = table
            .assignments
            .get(&record.path)
            .cloned()
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_owned());
    }
}

/// Replaces every record's notes with the table's entry.
pub fn overlay_notes(collection: &mut Collection, table: &NoteTable) {
    for record in collection.iter_mut() {
        record.user.notes = table.get(&record.path).cloned().unwrap_or_default();
    }
}

/// Sets every record's favourite flag from the table.
pub fn overlay_favorites(collection: &mut Collection, table: &FavoriteTable) {
    for record in collection.iter_mut() {
        record.user.favorite = table.contains(&record.path);
    }
}
