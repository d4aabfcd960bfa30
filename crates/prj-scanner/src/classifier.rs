//! Project-root detection and primary language selection.
//!
//! [`PathClassifier::classify`] reads one directory and answers two
//! questions: is it the top of a project, and which language is it
//! written in. It is a pure function of the filesystem at call time.
//!
//! # Rules
//!
//! A directory is a project when its top level holds a VCS marker, a
//! registry manifest, a registry entry point or a file with a registry
//! extension.
//!
//! Language selection counts source extensions down to the sample depth,
//! skipping excluded directories. When the top level holds manifests, the
//! choice is restricted to the manifest languages; otherwise every counted
//! language competes. The highest count wins and registry order breaks
//! ties.

use std::fs;

use camino::Utf8Path;
use prj_core::Language;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::error::ScanError;
use crate::filter::DirFilter;
use crate::registry;

/// Outcome of classifying one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Whether the directory is a project root.
    pub is_project: bool,
    /// Primary language, if one could be determined.
    pub language: Option<Language>,
    /// Languages with a manifest at the top level, in registry order.
    pub manifest_languages: SmallVec<[Language; 2]>,
    /// Whether a VCS marker is present.
    pub has_vcs: bool,
}

impl Classification {
    fn not_a_project() -> Self {
        Self::default()
    }
}

/// Decides whether directories are project roots.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use prj_scanner::{DirFilter, PathClassifier};
///
/// let classifier = PathClassifier::new(DirFilter::new(), 3);
/// let result = classifier.classify(Utf8Path::new("/src/my-app"))?;
/// if result.is_project {
///     println!("{:?}", result.language);
/// }
/// # Ok::<(), prj_scanner::ScanError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PathClassifier {
    filter: DirFilter,
    sample_depth: usize,
}

impl PathClassifier {
    /// Creates a classifier that samples extensions `sample_depth` levels
    /// deep (at least one).
    #[must_use]
    pub fn new(filter: DirFilter, sample_depth: usize) -> Self {
        Self {
            filter,
            sample_depth: sample_depth.max(1),
        }
    }

    /// Classifies `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Read`] if the directory cannot be listed. The
    /// walker turns this into a diagnostic and does not descend.
    pub fn classify(&self, dir: &Utf8Path) -> Result<Classification, ScanError> {
        let entries = fs::read_dir(dir).map_err(|e| ScanError::read(dir, e))?;

        let mut has_vcs = false;
        let mut has_entry_point = false;
        let mut has_source = false;
        let mut manifest_languages: SmallVec<[Language; 2]> = SmallVec::new();

        for entry in entries {
            let entry = entry.map_err(|e| ScanError::read(dir, e))?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };

            if registry::is_vcs_marker(&name) {
                has_vcs = true;
                continue;
            }
            if entry.file_type().is_ok_and(|ft| ft.is_dir()) {
                continue;
            }

            for lang in registry::manifest_languages(&name) {
                if !manifest_languages.contains(&lang) {
                    manifest_languages.push(lang);
                }
            }
            has_entry_point |= registry::entry_point_language(&name).is_some();
            has_source |= Utf8Path::new(&name)
                .extension()
                .and_then(registry::language_for_extension)
                .is_some();
        }

        let is_project = has_vcs || has_entry_point || has_source || !manifest_languages.is_empty();
        if !is_project {
            return Ok(Classification::not_a_project());
        }

        manifest_languages.sort_by_key(|lang| registry::priority(*lang));
        let counts = self.count_extensions(dir);
        let language = choose_language(&counts, &manifest_languages);

        trace!(dir = %dir, ?language, manifests = manifest_languages.len(), "Classified project");

        Ok(Classification {
            is_project,
            language,
            manifest_languages,
            has_vcs,
        })
    }

    /// Counts registry source files per language down to the sample depth.
    #[must_use]
    pub fn count_extensions(&self, dir: &Utf8Path) -> FxHashMap<Language, usize> {
        let mut counts = FxHashMap::default();
        for entry in self.filter.project_walk(dir, Some(self.sample_depth)) {
            let Ok(entry) = entry else {
                continue;
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let lang = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(registry::language_for_extension);
            if let Some(lang) = lang {
                *counts.entry(lang).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Picks the primary language from extension counts.
///
/// With manifests present only the manifest languages are eligible, so a
/// manifest always beats raw counts for another language. Highest count
/// wins; registry order breaks ties. Returns `None` when nothing is
/// eligible.
#[must_use]
pub fn choose_language(
    counts: &FxHashMap<Language, usize>,
    manifest_languages: &[Language],
) -> Option<Language> {
    let count_of = |lang: &Language| counts.get(lang).copied().unwrap_or(0);

    let eligible: SmallVec<[Language; 4]> = if manifest_languages.is_empty() {
        counts
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(lang, _)| *lang)
            .collect()
    } else {
        manifest_languages.iter().copied().collect()
    };

    eligible.into_iter().min_by(|a, b| {
        count_of(b)
            .cmp(&count_of(a))
            .then_with(|| registry::priority(*a).cmp(&registry::priority(*b)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn tree(files: &[&str]) -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "").unwrap();
        }
        (dir, root)
    }

    fn classifier() -> PathClassifier {
        PathClassifier::new(DirFilter::new(), 3)
    }

    #[test]
    fn test_manifest_beats_extension_counts() {
        let (_dir, root) = tree(&[
            "Cargo.toml",
            "src/main.rs",
            "scripts/a.py",
            "scripts/b.py",
            "scripts/c.py",
        ]);
        let result = classifier().classify(&root).unwrap();
        assert!(result.is_project);
        assert_eq!(result.language, Some(Language::Rust));
    }

    #[test]
    fn test_extension_counts_without_manifest() {
        let (_dir, root) = tree(&["a.go", "b.go", "c.py"]);
        let result = classifier().classify(&root).unwrap();
        assert_eq!(result.language, Some(Language::Go));
    }

    #[test]
    fn test_tie_broken_by_priority() {
        let (_dir, root) = tree(&["a.py", "b.rb"]);
        let result = classifier().classify(&root).unwrap();
        assert_eq!(result.language, Some(Language::Python));
    }

    #[test]
    fn test_multiple_manifests_use_counts() {
        let (_dir, root) = tree(&["package.json", "tsconfig.json", "src/a.ts", "src/b.ts", "x.js"]);
        let result = classifier().classify(&root).unwrap();
        assert_eq!(result.language, Some(Language::TypeScript));
        assert_eq!(
            result.manifest_languages.as_slice(),
            &[Language::TypeScript, Language::JavaScript]
        );
    }

    #[test]
    fn test_vcs_only_project_is_unknown() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();

        let result = classifier().classify(&root).unwrap();
        assert!(result.is_project);
        assert!(result.has_vcs);
        assert_eq!(result.language, None);
    }

    #[test]
    fn test_plain_directory_is_not_a_project() {
        let (_dir, root) = tree(&["photos/cat.jpg", "todo.txt"]);
        let result = classifier().classify(&root).unwrap();
        assert!(!result.is_project);
    }

    #[test]
    fn test_excluded_dirs_not_counted() {
        let (_dir, root) = tree(&["main.py", "node_modules/x/a.js", "node_modules/x/b.js"]);
        let result = classifier().classify(&root).unwrap();
        assert_eq!(result.language, Some(Language::Python));
    }

    #[test]
    fn test_missing_directory_is_error() {
        let err = classifier()
            .classify(Utf8Path::new("/definitely/not/here"))
            .unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_choose_language_empty() {
        assert_eq!(choose_language(&FxHashMap::default(), &[]), None);
    }
}
