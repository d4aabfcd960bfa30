//! Dependency manifest inspection and collection statistics.
//!
//! [`DependencyInspector`] reads the dependency manifests the registry
//! lists for a project's language and reduces them to a sorted, deduplicated
//! [`DependencySummary`]. Version constraints are dropped. A manifest that
//! cannot be parsed contributes nothing; the project is still listed.
//!
//! [`DependencyStatistics`] is a pure reduction over a collection of
//! records, computed on demand.

use std::collections::BTreeMap;
use std::fs;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use prj_core::{DependencySummary, Language, ProjectRecord};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Diagnostic, DiagnosticKind};
use crate::registry::{self, FilePattern, ManifestFormat, ManifestSource};

static SETUP_INSTALL_REQUIRES: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)install_requires\s*=\s*\[(.*?)\]").ok());

static QUOTED: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r#"["']([^"']+)["']"#).ok());

static POM_DEPENDENCY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<dependency>(.*?)</dependency>").ok());

static POM_GROUP: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"<groupId>\s*([^<\s]+)\s*</groupId>").ok());

static POM_ARTIFACT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"<artifactId>\s*([^<\s]+)\s*</artifactId>").ok());

static GRADLE_DEPENDENCY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^\s*(?:implementation|api|compileOnly|runtimeOnly|testImplementation|testRuntimeOnly|annotationProcessor|kapt)\s*\(?\s*["']([^"']+)["']"#,
    )
    .ok()
});

static CSPROJ_PACKAGE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"<PackageReference\s+Include\s*=\s*"([^"]+)""#).ok());

static GEMFILE_GEM: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*gem\s+["']([^"']+)["']"#).ok());

static SWIFT_PACKAGE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"\.package\s*\([^)]*?url:\s*"([^"]+)""#).ok());

fn captures_iter<'t>(re: &LazyLock<Option<Regex>>, text: &'t str) -> Vec<&'t str> {
    re.as_ref().map_or_else(Vec::new, |re| {
        re.captures_iter(text)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect()
    })
}

/// Reads dependency manifests.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyInspector;

impl DependencyInspector {
    /// Creates an inspector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns the dependency summary for the project at `path`.
    ///
    /// With a known language only that language's manifests are read;
    /// otherwise every registry manifest found at the top level is.
    #[must_use]
    pub fn inspect(&self, path: &Utf8Path, language: Option<Language>) -> DependencySummary {
        self.inspect_reporting(path, language, &mut Vec::new())
    }

    /// Like [`inspect`](Self::inspect), recording unreadable or malformed
    /// manifests in `diagnostics`.
    pub fn inspect_reporting(
        &self,
        path: &Utf8Path,
        language: Option<Language>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> DependencySummary {
        let top_level = list_files(path);
        let mut names: Vec<String> = Vec::new();

        for source in sources_for(language) {
            for file in top_level.iter().filter(|f| source.pattern.matches(f.as_str())) {
                let manifest = path.join(file);
                let parsed = fs::read_to_string(&manifest)
                    .map_err(|e| e.to_string())
                    .and_then(|text| parse_manifest(&text, source.format));
                match parsed {
                    Ok(found) => names.extend(found),
                    Err(reason) => {
                        debug!(manifest = %manifest, %reason, "Ignoring unparseable manifest");
                        diagnostics.push(Diagnostic::new(
                            manifest.as_str(),
                            DiagnosticKind::FieldDefaulted,
                            format!("dependency manifest: {reason}"),
                        ));
                    }
                }
            }
        }

        DependencySummary::from_names(names)
    }
}

fn sources_for(language: Option<Language>) -> Vec<ManifestSource> {
    let mut sources: Vec<ManifestSource> = Vec::new();
    let specs: Vec<_> = match language.and_then(registry::spec_for) {
        Some(spec) => vec![spec],
        None => registry::LANGUAGES.iter().collect(),
    };
    for spec in specs {
        for source in spec.dependency_manifests {
            if !sources.contains(source) {
                sources.push(*source);
            }
        }
    }
    sources
}

fn list_files(dir: &Utf8Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|ft| ft.is_file()))
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    files.sort();
    files
}

/// Lowercases a Python distribution name and turns `_` into `-`.
#[must_use]
pub fn normalize_python_name(name: &str) -> String {
    name.trim().to_lowercase().replace('_', "-")
}

/// Extracts the distribution name from a PEP 508 requirement string.
fn pep508_name(requirement: &str) -> Option<String> {
    let name: String = requirement
        .trim()
        .chars()
        .take_while(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    (!name.is_empty()).then(|| normalize_python_name(&name))
}

/// Parses manifest contents into raw dependency names.
///
/// # Errors
///
/// Returns a description of the syntax error for malformed TOML or JSON
/// manifests. Line-oriented formats never fail.
pub fn parse_manifest(text: &str, format: ManifestFormat) -> Result<Vec<String>, String> {
    let names = match format {
        ManifestFormat::Cargo => {
            let doc: toml::Table = text.parse().map_err(|e: toml::de::Error| e.to_string())?;
            ["dependencies", "dev-dependencies", "build-dependencies"]
                .iter()
                .filter_map(|table| doc.get(*table).and_then(toml::Value::as_table))
                .flat_map(|table| table.keys().cloned())
                .collect()
        }
        ManifestFormat::PackageJson => {
            let doc: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
            json_keys(&doc, &["dependencies", "devDependencies", "peerDependencies"])
                .into_iter()
                .collect()
        }
        ManifestFormat::Composer => {
            let doc: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
            json_keys(&doc, &["require", "require-dev"])
                .into_iter()
                .filter(|name| name != "php" && !name.starts_with("ext-"))
                .collect()
        }
        ManifestFormat::Vcpkg => {
            let doc: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
            doc.get("dependencies")
                .and_then(serde_json::Value::as_array)
                .map(|deps| {
                    deps.iter()
                        .filter_map(|d| {
                            d.as_str()
                                .or_else(|| d.get("name").and_then(serde_json::Value::as_str))
                                .map(ToOwned::to_owned)
                        })
                        .collect()
                })
                .unwrap_or_default()
        }
        ManifestFormat::Requirements => text
            .lines()
            .map(|line| line.split('#').next().unwrap_or_default().trim())
            .filter(|line| !line.is_empty() && !line.starts_with('-'))
            .filter_map(pep508_name)
            .collect(),
        ManifestFormat::PyProject => {
            let doc: toml::Table = text.parse().map_err(|e: toml::de::Error| e.to_string())?;
            let mut names: Vec<String> = doc
                .get("project")
                .and_then(|p| p.get("dependencies"))
                .and_then(toml::Value::as_array)
                .map(|deps| {
                    deps.iter()
                        .filter_map(toml::Value::as_str)
                        .filter_map(pep508_name)
                        .collect()
                })
                .unwrap_or_default();
            if let Some(poetry) = doc.get("tool").and_then(|t| t.get("poetry")) {
                for table in ["dependencies", "dev-dependencies"] {
                    if let Some(deps) = poetry.get(table).and_then(toml::Value::as_table) {
                        names.extend(
                            deps.keys()
                                .filter(|k| !k.eq_ignore_ascii_case("python"))
                                .map(|k| normalize_python_name(k)),
                        );
                    }
                }
            }
            names
        }
        ManifestFormat::SetupPy => {
            let block = SETUP_INSTALL_REQUIRES
                .as_ref()
                .and_then(|re| re.captures(text))
                .and_then(|c| c.get(1))
                .map_or("", |m| m.as_str());
            captures_iter(&QUOTED, block)
                .into_iter()
                .filter_map(pep508_name)
                .collect()
        }
        ManifestFormat::GoMod => parse_go_mod(text),
        ManifestFormat::Pom => captures_iter(&POM_DEPENDENCY, text)
            .into_iter()
            .filter_map(|block| {
                let group = captures_iter(&POM_GROUP, block).into_iter().next()?;
                let artifact = captures_iter(&POM_ARTIFACT, block).into_iter().next()?;
                Some(format!("{group}:{artifact}"))
            })
            .collect(),
        ManifestFormat::Gradle => captures_iter(&GRADLE_DEPENDENCY, text)
            .into_iter()
            .map(|coordinate| {
                let mut parts = coordinate.split(':');
                match (parts.next(), parts.next()) {
                    (Some(group), Some(artifact)) => format!("{group}:{artifact}"),
                    _ => coordinate.to_owned(),
                }
            })
            .collect(),
        ManifestFormat::CsProj => captures_iter(&CSPROJ_PACKAGE, text)
            .into_iter()
            .map(ToOwned::to_owned)
            .collect(),
        ManifestFormat::Gemfile => captures_iter(&GEMFILE_GEM, text)
            .into_iter()
            .map(ToOwned::to_owned)
            .collect(),
        ManifestFormat::SwiftPackage => captures_iter(&SWIFT_PACKAGE, text)
            .into_iter()
            .filter_map(|url| {
                let last = url.trim_end_matches('/').rsplit('/').next()?;
                let name = last.strip_suffix(".git").unwrap_or(last);
                (!name.is_empty()).then(|| name.to_owned())
            })
            .collect(),
    };
    Ok(names)
}

fn json_keys(doc: &serde_json::Value, sections: &[&str]) -> Vec<String> {
    sections
        .iter()
        .filter_map(|section| doc.get(*section).and_then(serde_json::Value::as_object))
        .flat_map(|obj| obj.keys().cloned())
        .collect()
}

fn parse_go_mod(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut in_block = false;
    for line in text.lines() {
        let line = line.split("//").next().unwrap_or_default().trim();
        if in_block {
            if line.starts_with(')') {
                in_block = false;
            } else if let Some(module) = line.split_whitespace().next() {
                names.push(module.to_owned());
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("require") {
            let rest = rest.trim();
            if rest.starts_with('(') {
                in_block = true;
            } else if let Some(module) = rest.split_whitespace().next() {
                names.push(module.to_owned());
            }
        }
    }
    names
}

/// Aggregate dependency usage across a collection.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use prj_core::{DependencySummary, ProjectRecord, ScanFacts};
/// use prj_scanner::DependencyStatistics;
///
/// let mut a = ProjectRecord::new(Utf8PathBuf::from("/p/a"), ScanFacts::default());
/// a.scan.dependencies = DependencySummary::from_names(["serde", "tokio"]);
/// let mut b = ProjectRecord::new(Utf8PathBuf::from("/p/b"), ScanFacts::default());
/// b.scan.dependencies = DependencySummary::from_names(["serde"]);
///
/// let stats = DependencyStatistics::from_records([&a, &b]);
/// assert_eq!(stats.total_unique, 2);
/// assert_eq!(stats.top(1), vec![("serde", 2)]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyStatistics {
    /// Number of distinct dependency names.
    pub total_unique: usize,
    /// Number of projects declaring at least one dependency.
    pub projects_with_dependencies: usize,
    /// Total dependency declarations across all projects.
    pub total_declarations: usize,
    /// Number of projects using each dependency.
    pub usage: BTreeMap<String, usize>,
}

impl DependencyStatistics {
    /// Reduces the dependency summaries of `records`.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ProjectRecord>,
    {
        let mut stats = Self::default();
        for record in records {
            let deps = &record.scan.dependencies;
            if deps.is_empty() {
                continue;
            }
            stats.projects_with_dependencies += 1;
            stats.total_declarations += deps.entries.len();
            for name in &deps.entries {
                *stats.usage.entry(name.clone()).or_insert(0) += 1;
            }
        }
        stats.total_unique = stats.usage.len();
        stats
    }

    /// The `n` most used dependencies, most used first, ties by name.
    #[must_use]
    pub fn top(&self, n: usize) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> =
            self.usage.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(n);
        ranked
    }
}

/// Paths of the dependency manifests present at the top of `dir`.
#[must_use]
pub fn manifest_paths(dir: &Utf8Path, language: Option<Language>) -> Vec<Utf8PathBuf> {
    let files = list_files(dir);
    let patterns: Vec<FilePattern> = sources_for(language).iter().map(|s| s.pattern).collect();
    files
        .iter()
        .filter(|f| patterns.iter().any(|p| p.matches(f)))
        .map(|f| dir.join(f))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(text: &str, format: ManifestFormat) -> Vec<String> {
        let mut found = parse_manifest(text, format).unwrap();
        found.sort();
        found
    }

    #[test]
    fn test_cargo_manifest() {
        let text = r#"
[package]
name = "demo"

[dependencies]
serde = { version = "1", features = ["derive"] }
anyhow = "1"

[dev-dependencies]
tempfile = "3"
"#;
        assert_eq!(names(text, ManifestFormat::Cargo), vec!["anyhow", "serde", "tempfile"]);
    }

    #[test]
    fn test_package_json() {
        let text = r#"{"dependencies": {"react": "^18"}, "devDependencies": {"vite": "5"}}"#;
        assert_eq!(names(text, ManifestFormat::PackageJson), vec!["react", "vite"]);
    }

    #[test]
    fn test_requirements_txt() {
        let text = "# web\nDjango>=4.2\nrequests[socks]==2.31 ; python_version>'3'\n-r base.txt\nPyYAML\ntyping_extensions\n";
        assert_eq!(
            names(text, ManifestFormat::Requirements),
            vec!["django", "pyyaml", "requests", "typing-extensions"]
        );
    }

    #[test]
    fn test_pyproject() {
        let text = r#"
[project]
dependencies = ["httpx>=0.27", "Rich"]

[tool.poetry.dependencies]
python = "^3.11"
click = "^8"
"#;
        assert_eq!(names(text, ManifestFormat::PyProject), vec!["click", "httpx", "rich"]);
    }

    #[test]
    fn test_setup_py() {
        let text = "setup(\n  name='x',\n  install_requires=[\n    'numpy>=1.20',\n    \"scikit_learn\",\n  ],\n)";
        assert_eq!(names(text, ManifestFormat::SetupPy), vec!["numpy", "scikit-learn"]);
    }

    #[test]
    fn test_go_mod() {
        let text = "module example.com/app\n\ngo 1.22\n\nrequire github.com/spf13/cobra v1.8.0\n\nrequire (\n\tgolang.org/x/sync v0.7.0 // indirect\n\tgithub.com/stretchr/testify v1.9.0\n)\n";
        assert_eq!(
            names(text, ManifestFormat::GoMod),
            vec![
                "github.com/spf13/cobra",
                "github.com/stretchr/testify",
                "golang.org/x/sync"
            ]
        );
    }

    #[test]
    fn test_pom_and_gradle() {
        let pom = "<dependencies><dependency><groupId>junit</groupId><artifactId>junit</artifactId><version>4</version></dependency></dependencies>";
        assert_eq!(names(pom, ManifestFormat::Pom), vec!["junit:junit"]);

        let gradle = "dependencies {\n    implementation 'com.google.guava:guava:33.0.0-jre'\n    testImplementation(\"org.junit.jupiter:junit-jupiter:5.10.0\")\n}\n";
        assert_eq!(
            names(gradle, ManifestFormat::Gradle),
            vec!["com.google.guava:guava", "org.junit.jupiter:junit-jupiter"]
        );
    }

    #[test]
    fn test_composer_skips_platform_packages() {
        let text = r#"{"require": {"php": ">=8.1", "ext-json": "*", "monolog/monolog": "^3"}}"#;
        assert_eq!(names(text, ManifestFormat::Composer), vec!["monolog/monolog"]);
    }

    #[test]
    fn test_misc_formats() {
        assert_eq!(
            names("source 'https://rubygems.org'\ngem 'rails', '~> 7'\n", ManifestFormat::Gemfile),
            vec!["rails"]
        );
        assert_eq!(
            names(r#"<PackageReference Include="Newtonsoft.Json" Version="13" />"#, ManifestFormat::CsProj),
            vec!["Newtonsoft.Json"]
        );
        assert_eq!(
            names(r#"{"dependencies": ["fmt", {"name": "boost-asio"}]}"#, ManifestFormat::Vcpkg),
            vec!["boost-asio", "fmt"]
        );
        assert_eq!(
            names(
                r#".package(url: "https://github.com/apple/swift-argument-parser.git", from: "1.3.0")"#,
                ManifestFormat::SwiftPackage
            ),
            vec!["swift-argument-parser"]
        );
    }

    #[test]
    fn test_broken_manifest_yields_empty_summary() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs::write(root.join("package.json"), "{ not json").unwrap();

        let mut diagnostics = Vec::new();
        let summary = DependencyInspector::new().inspect_reporting(
            &root,
            Some(Language::JavaScript),
            &mut diagnostics,
        );
        assert!(summary.is_empty());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_inspect_dedups_across_manifests() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs::write(root.join("requirements.txt"), "Flask\nrequests\n").unwrap();
        fs::write(root.join("setup.py"), "setup(install_requires=['flask'])").unwrap();

        let summary = DependencyInspector::new().inspect(&root, Some(Language::Python));
        assert_eq!(summary.entries, vec!["flask", "requests"]);
        assert_eq!(summary.count, 2);
    }

    #[test]
    fn test_top_ranking() {
        let stats = DependencyStatistics {
            total_unique: 3,
            projects_with_dependencies: 3,
            total_declarations: 5,
            usage: BTreeMap::from([
                ("b".to_owned(), 2),
                ("a".to_owned(), 2),
                ("c".to_owned(), 1),
            ]),
        };
        assert_eq!(stats.top(2), vec![("a", 2), ("b", 2)]);
    }
}
