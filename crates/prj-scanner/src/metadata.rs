//! Metadata extraction for confirmed project roots.
//!
//! [`MetadataExtractor`] fills the scan-derived half of a
//! [`ProjectRecord`](prj_core::ProjectRecord): size, modification time,
//! marker flags, readme description, entry point, version and dependency
//! summary. Every field is computed independently; a read error leaves that
//! field at its default and is recorded as a [`Diagnostic`].
//!
//! # Version search
//!
//! Candidate version files are collected breadth-first down to the sample
//! depth and ordered by `(depth, candidate index, path)`. The language's
//! own declarations come first, then the generic `VERSION` files. The first
//! candidate that yields a version wins, so the declaration closest to the
//! project root is used.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::time::UNIX_EPOCH;

use camino::{Utf8Path, Utf8PathBuf};
use prj_core::{Language, ProjectVersion, ScanFacts};
use tracing::{debug, trace};

use crate::dependencies::DependencyInspector;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::filter::DirFilter;
use crate::registry::{self, VersionSource};
use crate::version_file;

/// Longest readme description kept, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 100;

/// Scan facts plus the problems met while computing them.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// The extracted facts.
    pub facts: ScanFacts,
    /// Per-file problems; each one left a field at its default.
    pub diagnostics: Vec<Diagnostic>,
}

/// Extracts scan-derived fields from a project directory.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use prj_core::Language;
/// use prj_scanner::{DirFilter, MetadataExtractor};
///
/// let extractor = MetadataExtractor::new(DirFilter::new(), 3);
/// let facts = extractor.extract(Utf8Path::new("/src/my-app"), Some(Language::Rust));
/// println!("{} bytes", facts.size);
/// ```
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    filter: DirFilter,
    sample_depth: usize,
    inspector: DependencyInspector,
}

impl MetadataExtractor {
    /// Creates an extractor that looks for version files `sample_depth`
    /// levels deep.
    #[must_use]
    pub fn new(filter: DirFilter, sample_depth: usize) -> Self {
        Self {
            filter,
            sample_depth: sample_depth.max(1),
            inspector: DependencyInspector::new(),
        }
    }

    /// Extracts the scan facts of `path`, discarding diagnostics.
    #[must_use]
    pub fn extract(&self, path: &Utf8Path, language: Option<Language>) -> ScanFacts {
        self.extract_reporting(path, language).facts
    }

    /// Extracts the scan facts of `path` together with diagnostics.
    #[must_use]
    pub fn extract_reporting(&self, path: &Utf8Path, language: Option<Language>) -> Extraction {
        let mut diagnostics = Vec::new();
        let mut facts = ScanFacts {
            language,
            has_vcs: registry::VCS_MARKERS
                .iter()
                .any(|marker| path.join(marker).is_dir()),
            ..ScanFacts::default()
        };

        let top_level = top_level_files(path, &mut diagnostics);
        facts.has_manifest = top_level.iter().any(|name| is_manifest(name));
        facts.main_file = main_file(&top_level, language);

        if let Some(readme) = registry::README_NAMES
            .iter()
            .find_map(|r| top_level.iter().find(|name| name.eq_ignore_ascii_case(r)))
        {
            facts.has_readme = true;
            facts.description = read_description(&path.join(readme), &mut diagnostics);
        }

        let (size, modified) = self.size_and_modified(path, &mut diagnostics);
        facts.size = size;
        facts.modified = modified;

        facts.version = self.find_version(path, language, &mut diagnostics);
        facts.dependencies = self
            .inspector
            .inspect_reporting(path, language, &mut diagnostics);

        trace!(
            path = %path,
            size = facts.size,
            version = facts.version.as_ref().map(ProjectVersion::raw),
            deps = facts.dependencies.count,
            "Extracted metadata"
        );

        Extraction { facts, diagnostics }
    }

    /// Sums file sizes and finds the latest tracked modification time.
    fn size_and_modified(&self, path: &Utf8Path, diagnostics: &mut Vec<Diagnostic>) -> (u64, u64) {
        let mut size = 0u64;
        let mut tracked_mtime: Option<u64> = None;
        let mut any_mtime: Option<u64> = None;

        for entry in self.filter.project_walk(path, None) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    diagnostics.push(Diagnostic::new(
                        path.as_str(),
                        DiagnosticKind::Unreadable,
                        e.to_string(),
                    ));
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    diagnostics.push(Diagnostic::new(
                        entry.path().to_string_lossy(),
                        DiagnosticKind::Unreadable,
                        e.to_string(),
                    ));
                    continue;
                }
            };

            size = size.saturating_add(metadata.len());

            let Some(mtime) = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
            else {
                continue;
            };
            any_mtime = any_mtime.max(Some(mtime));
            if entry
                .file_name()
                .to_str()
                .is_some_and(is_tracked_file)
            {
                tracked_mtime = tracked_mtime.max(Some(mtime));
            }
        }

        (size, tracked_mtime.or(any_mtime).unwrap_or(0))
    }

    /// Returns the version declared closest to the project root.
    fn find_version(
        &self,
        path: &Utf8Path,
        language: Option<Language>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ProjectVersion> {
        let candidates = version_candidates(language);
        let mut found: Vec<(usize, usize, Utf8PathBuf)> = Vec::new();

        for entry in self
            .filter
            .project_walk(path, Some(self.sample_depth))
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            let Some(index) = candidates.iter().position(|c| c.pattern.matches(name)) else {
                continue;
            };
            if let Some(file) = Utf8Path::from_path(entry.path()) {
                found.push((entry.depth(), index, file.to_owned()));
            }
        }
        found.sort();

        for (_, index, file) in found {
            let Some(source) = candidates.get(index) else {
                continue;
            };
            match version_file::read_version(&file, source.format) {
                Ok(Some(raw)) => {
                    debug!(file = %file, version = %raw, "Found version declaration");
                    return Some(ProjectVersion::parse(&raw));
                }
                Ok(None) => {}
                Err(e) => diagnostics.push(Diagnostic::new(
                    file.as_str(),
                    DiagnosticKind::FieldDefaulted,
                    format!("version: {e}"),
                )),
            }
        }
        None
    }
}

/// Version candidates in tie-break order for `language`.
fn version_candidates(language: Option<Language>) -> Vec<VersionSource> {
    let mut candidates: Vec<VersionSource> = Vec::new();
    let own: Box<dyn Iterator<Item = &VersionSource>> = match language.and_then(registry::spec_for)
    {
        Some(spec) => Box::new(spec.version_files.iter()),
        None => Box::new(registry::LANGUAGES.iter().flat_map(|s| s.version_files.iter())),
    };
    for source in own.chain(registry::GENERIC_VERSION_FILES.iter()) {
        if !candidates.contains(source) {
            candidates.push(*source);
        }
    }
    candidates
}

fn top_level_files(path: &Utf8Path, diagnostics: &mut Vec<Diagnostic>) -> Vec<String> {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                path.as_str(),
                DiagnosticKind::Unreadable,
                e.to_string(),
            ));
            return Vec::new();
        }
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|ft| ft.is_file()))
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}

fn is_manifest(name: &str) -> bool {
    registry::manifest_languages(name).next().is_some()
        || registry::LANGUAGES.iter().any(|spec| {
            spec.dependency_manifests
                .iter()
                .any(|m| m.pattern.matches(name))
        })
}

fn is_tracked_file(name: &str) -> bool {
    Utf8Path::new(name)
        .extension()
        .and_then(registry::language_for_extension)
        .is_some()
        || is_manifest(name)
}

/// First registry entry point present at the top level, preferring the
/// project's own language.
fn main_file(top_level: &[String], language: Option<Language>) -> Option<String> {
    let own = language
        .and_then(registry::spec_for)
        .map(|spec| spec.entry_points)
        .unwrap_or_default();
    own.iter()
        .chain(registry::LANGUAGES.iter().flat_map(|s| s.entry_points.iter()))
        .find(|entry| top_level.iter().any(|name| name == *entry))
        .map(|entry| (*entry).to_owned())
}

/// First line of a readme with leading `#` removed, truncated.
fn read_description(readme: &Utf8Path, diagnostics: &mut Vec<Diagnostic>) -> Option<String> {
    let mut line = Vec::new();
    let read = File::open(readme).and_then(|f| BufReader::new(f).read_until(b'\n', &mut line));
    if let Err(e) = read {
        diagnostics.push(Diagnostic::new(
            readme.as_str(),
            DiagnosticKind::FieldDefaulted,
            format!("description: {e}"),
        ));
        return None;
    }
    description_from_line(&String::from_utf8_lossy(&line))
}

fn description_from_line(line: &str) -> Option<String> {
    let text = line.trim().trim_start_matches('#').trim();
    let text: String = text.chars().take(MAX_DESCRIPTION_LEN).collect();
    (!text.is_empty()).then_some(text)
}
