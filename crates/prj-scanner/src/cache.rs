//! Persistent project cache.
//!
//! [`CacheStore`] owns the in-memory [`Collection`] plus the custom
//! categories and recent-access list, and persists them to a data
//! directory (see [`side_tables`](crate::side_tables) for the layout).
//!
//! # Locking
//!
//! State sits behind a [`parking_lot::RwLock`]. Readers take consistent
//! snapshots; a scan commit holds the write lock for its whole
//! merge-and-save, so no reader observes a half-merged collection. File
//! writes are additionally serialised by a save mutex.
//!
//! # Loading
//!
//! Loading never fails. A missing file is an empty table; a corrupt one is
//! reported as a [`LoadWarning`] and ignored. The collection is read first,
//! then each side table overlays the user field it owns. Side-table entries
//! for paths missing from the collection are held back and restored when a
//! scan finds the path again, so a lost `projects.json` costs no
//! annotations.
//!
//! # Saving
//!
//! `projects.json` is written last and is the commit point of a save.
//!
//! # Examples
//!
//! ```no_run
//! use camino::Utf8Path;
//! use prj_scanner::CacheStore;
//!
//! let (store, warnings) = CacheStore::open(Utf8Path::new("data"), 20)?;
//! for warning in &warnings {
//!     eprintln!("{warning}");
//! }
//! store.add_tag(Utf8Path::new("/src/app"), "Core")?;
//! store.save()?;
//! # Ok::<(), prj_scanner::ScanError>(())
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::{Mutex, RwLock};
use prj_core::{normalize_tag, suggest_category, CategoryDef, ProjectRecord, DEFAULT_CATEGORY};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::collection::{Collection, MergeSummary};
use crate::dependencies::DependencyStatistics;
use crate::error::ScanError;
use crate::persist::{read_json, write_json};
use crate::side_tables::{
    CategoriesFile, CollectionFile, FavoriteTable, NoteTable, PendingAnnotations, RecentEntry,
    SideTables, TagTable, UserTables, CATEGORIES_FILE, DEPENDENCY_CACHE_FILE,
    DEPENDENCY_STATS_FILE, FAVORITES_FILE, FORMAT_VERSION, NOTES_FILE, PROJECTS_FILE, RECENT_FILE,
    TAGS_FILE,
};

/// A cache file that could not be used at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// The file that was ignored.
    pub file: Utf8PathBuf,
    /// Why.
    pub message: String,
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ignored {}: {}", self.file, self.message)
    }
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    collection: Collection,
    pending: PendingAnnotations,
    custom_categories: Vec<CategoryDef>,
    recent: Vec<RecentEntry>,
}

impl StoreState {
    /// Gives fresh records at pending paths their held-back annotations,
    /// then drops pending entries under `root` the scan did not revisit.
    fn restore_pending(&mut self, root: &Utf8Path, fresh: &mut [ProjectRecord]) {
        for record in fresh.iter_mut() {
            if self.collection.get(&record.path).is_none() {
                if let Some(user) = self.pending.remove(&record.path) {
                    record.user = user;
                }
            }
        }
        self.pending
            .retain(|path, _| path.as_path() == root || !path.starts_with(root));
    }
}

/// The persisted project collection and its side tables.
#[derive(Debug)]
pub struct CacheStore {
    data_dir: Utf8PathBuf,
    max_recent: usize,
    state: RwLock<StoreState>,
    save_lock: Mutex<()>,
}

impl CacheStore {
    /// Opens the store in `data_dir`, creating the directory if needed,
    /// and loads whatever it holds.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Write`] if the directory cannot be created.
    /// Unreadable or corrupt files are never errors; they come back as
    /// warnings.
    pub fn open(
        data_dir: &Utf8Path,
        max_recent: usize,
    ) -> Result<(Self, Vec<LoadWarning>), ScanError> {
        fs::create_dir_all(data_dir).map_err(|e| ScanError::write(data_dir, e))?;
        let (state, warnings) = load_state(data_dir);
        info!(
            data_dir = %data_dir,
            projects = state.collection.len(),
            warnings = warnings.len(),
            "Loaded project cache"
        );
        Ok((
            Self {
                data_dir: data_dir.to_owned(),
                max_recent: max_recent.max(1),
                state: RwLock::new(state),
                save_lock: Mutex::new(()),
            },
            warnings,
        ))
    }

    /// Directory holding the cache files.
    #[must_use]
    pub fn data_dir(&self) -> &Utf8Path {
        &self.data_dir
    }

    /// Path of the collection file.
    #[must_use]
    pub fn projects_file(&self) -> Utf8PathBuf {
        self.data_dir.join(PROJECTS_FILE)
    }

    /// A consistent copy of the collection.
    #[must_use]
    pub fn snapshot(&self) -> Collection {
        self.state.read().collection.clone()
    }

    /// Runs `f` against the collection under the read lock.
    pub fn with_collection<R>(&self, f: impl FnOnce(&Collection) -> R) -> R {
        f(&self.state.read().collection)
    }

    /// A copy of one record.
    #[must_use]
    pub fn get(&self, path: &Utf8Path) -> Option<ProjectRecord> {
        self.state.read().collection.get(path).cloned()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().collection.len()
    }

    /// Returns `true` if the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().collection.is_empty()
    }

    /// Writes every cache file.
    ///
    /// # Errors
    ///
    /// Returns the first write failure. Side tables already written stay
    /// written; `projects.json` is only replaced once they all succeeded.
    pub fn save(&self) -> Result<(), ScanError> {
        let state = self.state.read();
        self.persist(&state)
    }

    /// Commits a completed scan of `root`: merges `fresh`, prunes records
    /// under `root` that were not revisited, and saves.
    ///
    /// # Errors
    ///
    /// Returns the save failure. The in-memory state and `projects.json`
    /// then both still hold the collection from before the commit; side
    /// tables written before the failure may already reflect the new one.
    pub fn commit_scan(
        &self,
        root: &Utf8Path,
        mut fresh: Vec<ProjectRecord>,
    ) -> Result<MergeSummary, ScanError> {
        let mut state = self.state.write();
        let mut next = state.clone();
        next.restore_pending(root, &mut fresh);
        let summary = next.collection.reconcile_scan(root, fresh);
        next.recent
            .retain(|entry| next.collection.get(&entry.path).is_some());

        self.persist(&next)?;
        *state = next;

        info!(
            root = %root,
            added = summary.added,
            updated = summary.updated,
            removed = summary.removed,
            "Committed scan"
        );
        Ok(summary)
    }

    fn persist(&self, state: &StoreState) -> Result<(), ScanError> {
        let _guard = self.save_lock.lock();
        let tables = SideTables::from_collection(
            &state.collection,
            &state.pending,
            &state.custom_categories,
        );
        let dir = &self.data_dir;

        write_json(&dir.join(TAGS_FILE), &tables.tags)?;
        write_json(&dir.join(CATEGORIES_FILE), &tables.categories)?;
        write_json(&dir.join(NOTES_FILE), &tables.notes)?;
        write_json(&dir.join(FAVORITES_FILE), &tables.favorites)?;
        write_json(&dir.join(RECENT_FILE), &state.recent)?;
        write_json(&dir.join(DEPENDENCY_CACHE_FILE), &tables.dependency_cache)?;
        write_json(&dir.join(DEPENDENCY_STATS_FILE), &tables.dependency_stats)?;
        write_json(
            &dir.join(PROJECTS_FILE),
            &CollectionFile {
                format: FORMAT_VERSION,
                projects: state.collection.iter().cloned().collect(),
            },
        )?;

        debug!(data_dir = %dir, projects = state.collection.len(), "Saved project cache");
        Ok(())
    }

    fn edit<R>(
        &self,
        path: &Utf8Path,
        f: impl FnOnce(&mut ProjectRecord) -> R,
    ) -> Result<R, ScanError> {
        let mut state = self.state.write();
        state
            .collection
            .get_mut(path)
            .map(f)
            .ok_or_else(|| ScanError::UnknownProject(path.to_owned()))
    }

    /// Built-in categories followed by custom ones.
    #[must_use]
    pub fn categories(&self) -> Vec<CategoryDef> {
        let mut all = CategoryDef::builtin();
        all.extend(self.state.read().custom_categories.iter().cloned());
        all
    }

    fn is_known_category(&self, key: &str) -> bool {
        is_known_category(&self.state.read(), key)
    }

    /// Assigns a category.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::UnknownCategory`] for an undefined key, or
    /// [`ScanError::UnknownProject`] for an unknown path.
    pub fn set_category(&self, path: &Utf8Path, key: &str) -> Result<(), ScanError> {
        if !self.is_known_category(key) {
            return Err(ScanError::UnknownCategory(key.to_owned()));
        }
        self.edit(path, |record| record.user.category = key.to_owned())
    }

    /// Resets a project to the default category.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::UnknownProject`] for an unknown path.
    pub fn clear_category(&self, path: &Utf8Path) -> Result<(), ScanError> {
        self.edit(path, |record| DEFAULT_CATEGORY.clone_into(&mut record.user.category))
    }

    /// Adds a normalised tag. Returns `false` if the tag normalises to
    /// nothing or was already present.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::UnknownProject`] for an unknown path.
    pub fn add_tag(&self, path: &Utf8Path, tag: &str) -> Result<bool, ScanError> {
        let tag = normalize_tag(tag);
        self.edit(path, |record| {
            tag.is_some_and(|tag| record.user.tags.insert(tag))
        })
    }

    /// Removes a tag. Returns `false` if it was not present.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::UnknownProject`] for an unknown path.
    pub fn remove_tag(&self, path: &Utf8Path, tag: &str) -> Result<bool, ScanError> {
        let tag = normalize_tag(tag);
        self.edit(path, |record| {
            tag.is_some_and(|tag| record.user.tags.remove(&tag))
        })
    }

    /// Replaces all tags of a project.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::UnknownProject`] for an unknown path.
    pub fn set_tags<S: AsRef<str>>(&self, path: &Utf8Path, tags: &[S]) -> Result<(), ScanError> {
        let tags: BTreeSet<String> = tags.iter().filter_map(|t| normalize_tag(t.as_ref())).collect();
        self.edit(path, |record| record.user.tags = tags)
    }

    /// Sets the note of a project; blank text deletes it.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::UnknownProject`] for an unknown path.
    pub fn set_note(&self, path: &Utf8Path, text: &str) -> Result<(), ScanError> {
        let text = text.trim().to_owned();
        self.edit(path, |record| record.user.notes = text)
    }

    /// Deletes the note of a project.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::UnknownProject`] for an unknown path.
    pub fn delete_note(&self, path: &Utf8Path) -> Result<(), ScanError> {
        self.edit(path, |record| record.user.notes.clear())
    }

    /// Sets the favourite flag.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::UnknownProject`] for an unknown path.
    pub fn set_favorite(&self, path: &Utf8Path, favorite: bool) -> Result<(), ScanError> {
        self.edit(path, |record| record.user.favorite = favorite)
    }

    /// Flips the favourite flag, returning the new value.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::UnknownProject`] for an unknown path.
    pub fn toggle_favorite(&self, path: &Utf8Path) -> Result<bool, ScanError> {
        self.edit(path, |record| {
            record.user.favorite = !record.user.favorite;
            record.user.favorite
        })
    }

    /// Deletes a record explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::UnknownProject`] for an unknown path.
    pub fn remove_project(&self, path: &Utf8Path) -> Result<ProjectRecord, ScanError> {
        let mut state = self.state.write();
        let record = state
            .collection
            .remove(path)
            .ok_or_else(|| ScanError::UnknownProject(path.to_owned()))?;
        state.recent.retain(|entry| entry.path != path);
        Ok(record)
    }

    /// Moves a project to the front of the recent list.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::UnknownProject`] for an unknown path.
    pub fn track_access(&self, path: &Utf8Path) -> Result<(), ScanError> {
        let mut state = self.state.write();
        let name = state
            .collection
            .get(path)
            .map(|r| r.name.clone())
            .ok_or_else(|| ScanError::UnknownProject(path.to_owned()))?;
        state.recent.retain(|entry| entry.path != path);
        state.recent.insert(
            0,
            RecentEntry {
                path: path.to_owned(),
                name,
                accessed: unix_now(),
            },
        );
        state.recent.truncate(self.max_recent);
        Ok(())
    }

    /// Recently opened projects, most recent first.
    #[must_use]
    pub fn recent(&self) -> Vec<RecentEntry> {
        self.state.read().recent.clone()
    }

    /// Defines a custom category.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::DuplicateCategory`] if the key is taken or
    /// blank.
    pub fn add_category(&self, category: CategoryDef) -> Result<(), ScanError> {
        let mut state = self.state.write();
        if category.key.trim().is_empty() || is_known_category(&state, &category.key) {
            return Err(ScanError::DuplicateCategory(category.key));
        }
        state.custom_categories.push(category);
        Ok(())
    }

    /// Removes a custom category and resets its projects to the default.
    /// Returns how many projects were reset.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::UnknownCategory`] unless `key` is a custom
    /// category.
    pub fn remove_category(&self, key: &str) -> Result<usize, ScanError> {
        let mut state = self.state.write();
        let before = state.custom_categories.len();
        state.custom_categories.retain(|c| c.key != key);
        if state.custom_categories.len() == before {
            return Err(ScanError::UnknownCategory(key.to_owned()));
        }
        let mut reset = 0;
        for record in state.collection.iter_mut() {
            if record.user.category == key {
                DEFAULT_CATEGORY.clone_into(&mut record.user.category);
                reset += 1;
            }
        }
        Ok(reset)
    }

    /// Suggests a category for a project by keyword scoring.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::UnknownProject`] for an unknown path.
    pub fn suggest_category(&self, path: &Utf8Path) -> Result<Option<String>, ScanError> {
        let record = self
            .get(path)
            .ok_or_else(|| ScanError::UnknownProject(path.to_owned()))?;
        let categories = self.categories();
        Ok(suggest_category(
            &record.name,
            record.scan.description.as_deref().unwrap_or_default(),
            record.scan.language,
            &categories,
        )
        .map(ToOwned::to_owned))
    }

    /// Dependency usage across the collection.
    #[must_use]
    pub fn dependency_statistics(&self) -> DependencyStatistics {
        DependencyStatistics::from_records(self.state.read().collection.iter())
    }
}

fn is_known_category(state: &StoreState, key: &str) -> bool {
    CategoryDef::is_builtin_key(key) || state.custom_categories.iter().any(|c| c.key == key)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// Reads one table, turning failures into warnings.
fn load_table<T: DeserializeOwned>(
    data_dir: &Utf8Path,
    name: &str,
    warnings: &mut Vec<LoadWarning>,
) -> Option<T> {
    let path = data_dir.join(name);
    match read_json(&path) {
        Ok(table) => table,
        Err(e) => {
            warn!(file = %path, error = %e, "Ignoring unreadable cache file");
            warnings.push(LoadWarning {
                file: path,
                message: e.to_string(),
            });
            None
        }
    }
}

fn load_state(data_dir: &Utf8Path) -> (StoreState, Vec<LoadWarning>) {
    let mut warnings = Vec::new();
    let mut state = StoreState::default();

    if let Some(file) = load_table::<CollectionFile>(data_dir, PROJECTS_FILE, &mut warnings) {
        if file.format > FORMAT_VERSION {
            warnings.push(LoadWarning {
                file: data_dir.join(PROJECTS_FILE),
                message: format!("unsupported format {}", file.format),
            });
        } else {
            state.collection = file.projects.into_iter().collect();
        }
    }

    let tables = UserTables {
        tags: load_table::<TagTable>(data_dir, TAGS_FILE, &mut warnings),
        categories: load_table::<CategoriesFile>(data_dir, CATEGORIES_FILE, &mut warnings),
        notes: load_table::<NoteTable>(data_dir, NOTES_FILE, &mut warnings),
        favorites: load_table::<FavoriteTable>(data_dir, FAVORITES_FILE, &mut warnings),
    };
    tables.overlay(&mut state.collection);
    state.pending = tables.pending(&state.collection);
    if let Some(categories) = tables.categories {
        state.custom_categories = categories.custom;
    }
    if !state.pending.is_empty() {
        debug!(paths = state.pending.len(), "Holding annotations for unlisted paths");
    }
    if let Some(recent) = load_table::<Vec<RecentEntry>>(data_dir, RECENT_FILE, &mut warnings) {
        state.recent = recent;
    }

    (state, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prj_core::{Language, ScanFacts};
    use tempfile::TempDir;

    fn open() -> (TempDir, CacheStore) {
        let dir = TempDir::new().unwrap();
        let data = Utf8PathBuf::try_from(dir.path().join("data")).unwrap();
        let (store, warnings) = CacheStore::open(&data, 3).unwrap();
        assert!(warnings.is_empty());
        (dir, store)
    }

    fn record(path: &str) -> ProjectRecord {
        ProjectRecord::new(
            Utf8PathBuf::from(path),
            ScanFacts {
                language: Some(Language::Python),
                description: Some("A small web app".to_owned()),
                ..ScanFacts::default()
            },
        )
    }

    fn reopen(store: &CacheStore) -> (CacheStore, Vec<LoadWarning>) {
        CacheStore::open(store.data_dir(), 3).unwrap()
    }

    #[test]
    fn test_edits_round_trip() {
        let (_dir, store) = open();
        store
            .commit_scan(Utf8Path::new("/r"), vec![record("/r/app")])
            .unwrap();
        let path = Utf8Path::new("/r/app");

        assert!(store.add_tag(path, " Core ").unwrap());
        assert!(!store.add_tag(path, "core").unwrap());
        store.set_category(path, "web").unwrap();
        store.set_note(path, "  ship it ").unwrap();
        assert!(store.toggle_favorite(path).unwrap());
        store.save().unwrap();

        let (reloaded, warnings) = reopen(&store);
        assert!(warnings.is_empty());
        let app = reloaded.get(path).unwrap();
        assert!(app.user.tags.contains("core"));
        assert_eq!(app.user.category, "web");
        assert_eq!(app.user.notes, "ship it");
        assert!(app.user.favorite);
    }

    #[test]
    fn test_unknown_project_and_category() {
        let (_dir, store) = open();
        let err = store.add_tag(Utf8Path::new("/nope"), "x").unwrap_err();
        assert!(matches!(err, ScanError::UnknownProject(_)));

        store
            .commit_scan(Utf8Path::new("/r"), vec![record("/r/app")])
            .unwrap();
        let err = store
            .set_category(Utf8Path::new("/r/app"), "spaceships")
            .unwrap_err();
        assert!(matches!(err, ScanError::UnknownCategory(_)));
    }

    #[test]
    fn test_corrupt_side_table_keeps_listing() {
        let (_dir, store) = open();
        store
            .commit_scan(Utf8Path::new("/r"), vec![record("/r/app")])
            .unwrap();
        store.add_tag(Utf8Path::new("/r/app"), "core").unwrap();
        store.save().unwrap();
        fs::write(store.data_dir().join(TAGS_FILE), "{ broken").unwrap();

        let (reloaded, warnings) = reopen(&store);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].file.ends_with(TAGS_FILE));
        let app = reloaded.get(Utf8Path::new("/r/app")).unwrap();
        assert!(app.user.tags.contains("core"));
    }

    #[test]
    fn test_corrupt_collection_is_empty_with_warning() {
        let (_dir, store) = open();
        fs::write(store.projects_file(), "[1, 2").unwrap();
        let (reloaded, warnings) = reopen(&store);
        assert!(reloaded.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_annotations_survive_lost_collection() {
        let (_dir, store) = open();
        let path = Utf8Path::new("/r/app");
        store.commit_scan(Utf8Path::new("/r"), vec![record("/r/app")]).unwrap();
        store.add_tag(path, "core").unwrap();
        store.set_favorite(path, true).unwrap();
        store.set_note(path, "keep me").unwrap();
        store.save().unwrap();
        fs::write(store.projects_file(), "{ truncated").unwrap();

        let (reloaded, warnings) = reopen(&store);
        assert_eq!(warnings.len(), 1);
        assert!(reloaded.is_empty());

        let summary = reloaded
            .commit_scan(Utf8Path::new("/r"), vec![record("/r/app")])
            .unwrap();
        assert_eq!(summary.added, 1);
        let app = reloaded.get(path).unwrap();
        assert!(app.user.tags.contains("core"));
        assert!(app.user.favorite);
        assert_eq!(app.user.notes, "keep me");

        let tags: TagTable = read_json(&reloaded.data_dir().join(TAGS_FILE)).unwrap().unwrap();
        assert!(tags[path].contains("core"));
    }

    #[test]
    fn test_pending_annotations_kept_until_pruned() {
        let (_dir, store) = open();
        let path = Utf8Path::new("/r/app");
        store.commit_scan(Utf8Path::new("/r"), vec![record("/r/app")]).unwrap();
        store.add_tag(path, "core").unwrap();
        store.save().unwrap();
        fs::remove_file(store.projects_file()).unwrap();

        let (reloaded, _) = reopen(&store);
        let tags_file = reloaded.data_dir().join(TAGS_FILE);

        reloaded
            .commit_scan(Utf8Path::new("/elsewhere"), vec![record("/elsewhere/x")])
            .unwrap();
        let tags: TagTable = read_json(&tags_file).unwrap().unwrap();
        assert!(tags.contains_key(path));

        reloaded.commit_scan(Utf8Path::new("/r"), Vec::new()).unwrap();
        let tags: TagTable = read_json(&tags_file).unwrap().unwrap();
        assert!(!tags.contains_key(path));
    }

    #[test]
    fn test_failed_save_leaves_collection_file_untouched() {
        let (_dir, store) = open();
        store.commit_scan(Utf8Path::new("/r"), vec![record("/r/a")]).unwrap();
        let before = fs::read_to_string(store.projects_file()).unwrap();

        let tags_file = store.data_dir().join(TAGS_FILE);
        fs::remove_file(&tags_file).unwrap();
        fs::create_dir(&tags_file).unwrap();

        let result = store.commit_scan(Utf8Path::new("/r"), vec![record("/r/a"), record("/r/b")]);
        assert!(matches!(result, Err(ScanError::Write { .. })));
        assert!(store.get(Utf8Path::new("/r/b")).is_none());
        assert_eq!(fs::read_to_string(store.projects_file()).unwrap(), before);
    }

    #[test]
    fn test_concurrent_duplicate_category_rejected() {
        let (_dir, store) = open();
        let category = CategoryDef {
            key: "research".to_owned(),
            name: "Research".to_owned(),
            description: String::new(),
            keywords: Vec::new(),
        };

        let accepted = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| store.add_category(category.clone()).is_ok()))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });
        assert_eq!(accepted, 1);
        assert_eq!(store.categories().iter().filter(|c| c.key == "research").count(), 1);
    }

    #[test]
    fn test_recent_is_bounded_and_deduplicated() {
        let (_dir, store) = open();
        let fresh = ["/r/a", "/r/b", "/r/c", "/r/d"].map(record).to_vec();
        store.commit_scan(Utf8Path::new("/r"), fresh).unwrap();

        for path in ["/r/a", "/r/b", "/r/c", "/r/d", "/r/b"] {
            store.track_access(Utf8Path::new(path)).unwrap();
        }
        let recent: Vec<_> = store.recent().into_iter().map(|e| e.path).collect();
        assert_eq!(recent, vec!["/r/b", "/r/d", "/r/c"]);
    }

    #[test]
    fn test_custom_categories() {
        let (_dir, store) = open();
        store
            .commit_scan(Utf8Path::new("/r"), vec![record("/r/app")])
            .unwrap();
        let research = CategoryDef {
            key: "research".to_owned(),
            name: "Research".to_owned(),
            description: String::new(),
            keywords: vec!["paper".to_owned()],
        };
        store.add_category(research.clone()).unwrap();
        assert!(matches!(
            store.add_category(research),
            Err(ScanError::DuplicateCategory(_))
        ));

        store.set_category(Utf8Path::new("/r/app"), "research").unwrap();
        assert_eq!(store.remove_category("research").unwrap(), 1);
        assert_eq!(
            store.get(Utf8Path::new("/r/app")).unwrap().user.category,
            DEFAULT_CATEGORY
        );
        assert!(store.remove_category("web").is_err());
    }

    #[test]
    fn test_suggest_category() {
        let (_dir, store) = open();
        store
            .commit_scan(Utf8Path::new("/r"), vec![record("/r/app")])
            .unwrap();
        assert_eq!(
            store.suggest_category(Utf8Path::new("/r/app")).unwrap().as_deref(),
            Some("web")
        );
    }

    #[test]
    fn test_remove_project() {
        let (_dir, store) = open();
        store
            .commit_scan(Utf8Path::new("/r"), vec![record("/r/app")])
            .unwrap();
        store.track_access(Utf8Path::new("/r/app")).unwrap();
        store.remove_project(Utf8Path::new("/r/app")).unwrap();
        assert!(store.is_empty());
        assert!(store.recent().is_empty());
    }
}
