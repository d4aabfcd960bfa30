//! Change notifications and the path → project mapping.

use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};

/// A debounced burst of changes inside one project.
///
/// The debouncer does not distinguish creation, modification and deletion;
/// any of them means the project's scan facts may be stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectChange {
    /// Root of the changed project.
    pub project: Utf8PathBuf,
    /// Changed paths, sorted and deduplicated.
    pub paths: Vec<Utf8PathBuf>,
}

/// The set of watched project roots.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use prj_watcher::ProjectIndex;
///
/// let index: ProjectIndex = ["/src/app", "/src/app/plugins/x"].into_iter().collect();
/// assert_eq!(
///     index.owner(Utf8Path::new("/src/app/plugins/x/lib.rs")),
///     Some(Utf8Path::new("/src/app/plugins/x"))
/// );
/// assert_eq!(index.owner(Utf8Path::new("/src/other/lib.rs")), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectIndex {
    roots: BTreeSet<Utf8PathBuf>,
}

impl ProjectIndex {
    /// Number of project roots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Returns `true` if there are no roots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Roots in path order.
    pub fn iter(&self) -> impl Iterator<Item = &Utf8Path> {
        self.roots.iter().map(Utf8PathBuf::as_path)
    }

    /// The innermost project containing `path`, if any.
    #[must_use]
    pub fn owner(&self, path: &Utf8Path) -> Option<&Utf8Path> {
        path.ancestors()
            .find_map(|ancestor| self.roots.get(ancestor))
            .map(Utf8PathBuf::as_path)
    }

    /// Groups changed paths by owning project, dropping paths outside every
    /// project.
    pub fn group<I>(&self, paths: I) -> Vec<ProjectChange>
    where
        I: IntoIterator<Item = Utf8PathBuf>,
    {
        let mut changes: Vec<ProjectChange> = Vec::new();
        let mut owned: Vec<(Utf8PathBuf, Utf8PathBuf)> = paths
            .into_iter()
            .filter_map(|path| Some((self.owner(&path)?.to_owned(), path)))
            .collect();
        owned.sort();
        owned.dedup();

        for (project, path) in owned {
            match changes.last_mut() {
                Some(change) if change.project == project => change.paths.push(path),
                _ => changes.push(ProjectChange {
                    project,
                    paths: vec![path],
                }),
            }
        }
        changes
    }
}

impl<P: Into<Utf8PathBuf>> FromIterator<P> for ProjectIndex {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            roots: iter.into_iter().map(Into::into).collect(),
        }
    }
}
