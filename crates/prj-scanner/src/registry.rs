//! Language registry.
//!
//! This module holds the static table that drives classification, metadata
//! extraction and dependency inspection. Each [`LanguageSpec`] lists the
//! files that mark a project of that language, the source extensions that
//! count towards it, its entry points, its version declarations and its
//! dependency manifests.
//!
//! The table is ordered: [`LANGUAGES`] is iterated front to back and the
//! position of an entry is its tie-break priority. Adding a language is
//! adding an entry.
//!
//! # Examples
//!
//! ```
//! use prj_core::Language;
//! use prj_scanner::registry;
//!
//! assert_eq!(registry::language_for_extension("RS"), Some(Language::Rust));
//! assert!(registry::spec_for(Language::Python).is_some());
//! assert!(registry::is_excluded_dir("node_modules"));
//! ```

use std::sync::LazyLock;

use prj_core::Language;
use rustc_hash::FxHashMap;

/// A filename pattern, matched case-insensitively against a bare file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePattern {
    /// The whole name, e.g. `Cargo.toml`.
    Exact(&'static str),
    /// A suffix, e.g. `.csproj` for `*.csproj`.
    Suffix(&'static str),
}

impl FilePattern {
    /// Returns `true` if `file_name` matches this pattern.
    #[must_use]
    pub fn matches(self, file_name: &str) -> bool {
        match self {
            Self::Exact(name) => file_name.eq_ignore_ascii_case(name),
            Self::Suffix(suffix) => {
                file_name.len() > suffix.len()
                    && file_name
                        .get(file_name.len() - suffix.len()..)
                        .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
            }
        }
    }

    /// Pattern text for display.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact(s) | Self::Suffix(s) => s,
        }
    }
}

/// How a version declaration file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionFormat {
    /// `[package] version` in `Cargo.toml`.
    CargoToml,
    /// Top-level `"version"` key of a JSON manifest.
    JsonVersion,
    /// `[project] version` or `[tool.poetry] version` in `pyproject.toml`.
    PyProject,
    /// `__version__ = "..."` or `version="..."` in Python source.
    PythonAssign,
    /// The project's own `<version>` in `pom.xml`.
    PomXml,
    /// `version = '...'` in a Gradle build script.
    Gradle,
    /// `spec.version = "..."` in a gemspec.
    Gemspec,
    /// `<Version>` in an MSBuild project.
    CsProj,
    /// The first non-empty line of a plain text file.
    PlainText,
}

/// A version declaration candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionSource {
    /// Which files hold the declaration.
    pub pattern: FilePattern,
    /// How to read it.
    pub format: VersionFormat,
}

/// How a dependency manifest is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestFormat {
    /// `Cargo.toml` dependency tables.
    Cargo,
    /// `package.json` dependency objects.
    PackageJson,
    /// `requirements.txt` lines.
    Requirements,
    /// `pyproject.toml` PEP 621 or Poetry dependencies.
    PyProject,
    /// `install_requires` in `setup.py`.
    SetupPy,
    /// `require` directives in `go.mod`.
    GoMod,
    /// `<dependency>` elements in `pom.xml`.
    Pom,
    /// Gradle dependency configurations.
    Gradle,
    /// `<PackageReference>` elements in an MSBuild project.
    CsProj,
    /// `gem` lines in a `Gemfile`.
    Gemfile,
    /// `composer.json` require objects.
    Composer,
    /// `vcpkg.json` dependency array.
    Vcpkg,
    /// `.package(url:)` entries in `Package.swift`.
    SwiftPackage,
}

/// A dependency manifest candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestSource {
    /// Which files hold the declarations.
    pub pattern: FilePattern,
    /// How to parse them.
    pub format: ManifestFormat,
}

/// Everything the scanner knows about one language.
#[derive(Debug, Clone, Copy)]
pub struct LanguageSpec {
    /// The language tag.
    pub language: Language,
    /// Top-level files that mark a project of this language.
    pub manifests: &'static [FilePattern],
    /// Dependency manifests, in lookup order.
    pub dependency_manifests: &'static [ManifestSource],
    /// Source file extensions, lowercase, without the dot.
    pub extensions: &'static [&'static str],
    /// Conventional entry-point files at the project top level.
    pub entry_points: &'static [&'static str],
    /// Version declarations, in tie-break order.
    pub version_files: &'static [VersionSource],
}

const fn exact(name: &'static str) -> FilePattern {
    FilePattern::Exact(name)
}

const fn version(pattern: FilePattern, format: VersionFormat) -> VersionSource {
    VersionSource { pattern, format }
}

const fn manifest(pattern: FilePattern, format: ManifestFormat) -> ManifestSource {
    ManifestSource { pattern, format }
}

/// The registry, in priority order.
pub static LANGUAGES: &[LanguageSpec] = &[
    LanguageSpec {
        language: Language::Rust,
        manifests: &[exact("Cargo.toml")],
        dependency_manifests: &[manifest(exact("Cargo.toml"), ManifestFormat::Cargo)],
        extensions: &["rs"],
        entry_points: &["main.rs", "lib.rs"],
        version_files: &[version(exact("Cargo.toml"), VersionFormat::CargoToml)],
    },
    LanguageSpec {
        language: Language::Go,
        manifests: &[exact("go.mod")],
        dependency_manifests: &[manifest(exact("go.mod"), ManifestFormat::GoMod)],
        extensions: &["go"],
        entry_points: &["main.go"],
        version_files: &[],
    },
    LanguageSpec {
        language: Language::TypeScript,
        manifests: &[exact("tsconfig.json")],
        dependency_manifests: &[manifest(exact("package.json"), ManifestFormat::PackageJson)],
        extensions: &["ts", "tsx"],
        entry_points: &["index.ts", "main.ts"],
        version_files: &[version(exact("package.json"), VersionFormat::JsonVersion)],
    },
    LanguageSpec {
        language: Language::JavaScript,
        manifests: &[exact("package.json")],
        dependency_manifests: &[manifest(exact("package.json"), ManifestFormat::PackageJson)],
        extensions: &["js", "jsx", "mjs", "cjs"],
        entry_points: &["index.js", "main.js", "app.js", "server.js"],
        version_files: &[version(exact("package.json"), VersionFormat::JsonVersion)],
    },
    LanguageSpec {
        language: Language::Python,
        manifests: &[
            exact("pyproject.toml"),
            exact("requirements.txt"),
            exact("setup.py"),
            exact("setup.cfg"),
            exact("Pipfile"),
        ],
        dependency_manifests: &[
            manifest(exact("requirements.txt"), ManifestFormat::Requirements),
            manifest(exact("pyproject.toml"), ManifestFormat::PyProject),
            manifest(exact("setup.py"), ManifestFormat::SetupPy),
        ],
        extensions: &["py"],
        entry_points: &["main.py", "app.py", "__main__.py", "manage.py", "run.py"],
        version_files: &[
            version(exact("pyproject.toml"), VersionFormat::PyProject),
            version(exact("setup.py"), VersionFormat::PythonAssign),
            version(exact("version.py"), VersionFormat::PythonAssign),
            version(exact("__version__.py"), VersionFormat::PythonAssign),
            version(exact("__init__.py"), VersionFormat::PythonAssign),
        ],
    },
    LanguageSpec {
        language: Language::Java,
        manifests: &[exact("pom.xml"), exact("build.gradle")],
        dependency_manifests: &[
            manifest(exact("pom.xml"), ManifestFormat::Pom),
            manifest(exact("build.gradle"), ManifestFormat::Gradle),
        ],
        extensions: &["java"],
        entry_points: &["Main.java", "App.java"],
        version_files: &[
            version(exact("pom.xml"), VersionFormat::PomXml),
            version(exact("build.gradle"), VersionFormat::Gradle),
        ],
    },
    LanguageSpec {
        language: Language::Kotlin,
        manifests: &[exact("build.gradle.kts"), exact("settings.gradle.kts")],
        dependency_manifests: &[manifest(exact("build.gradle.kts"), ManifestFormat::Gradle)],
        extensions: &["kt", "kts"],
        entry_points: &["Main.kt", "Application.kt"],
        version_files: &[version(exact("build.gradle.kts"), VersionFormat::Gradle)],
    },
    LanguageSpec {
        language: Language::CSharp,
        manifests: &[FilePattern::Suffix(".csproj"), FilePattern::Suffix(".sln")],
        dependency_manifests: &[manifest(FilePattern::Suffix(".csproj"), ManifestFormat::CsProj)],
        extensions: &["cs"],
        entry_points: &["Program.cs"],
        version_files: &[version(FilePattern::Suffix(".csproj"), VersionFormat::CsProj)],
    },
    LanguageSpec {
        language: Language::Cpp,
        manifests: &[exact("CMakeLists.txt"), exact("vcpkg.json"), exact("conanfile.txt")],
        dependency_manifests: &[manifest(exact("vcpkg.json"), ManifestFormat::Vcpkg)],
        extensions: &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
        entry_points: &["main.cpp", "main.cc"],
        version_files: &[version(exact("vcpkg.json"), VersionFormat::JsonVersion)],
    },
    LanguageSpec {
        language: Language::C,
        manifests: &[exact("meson.build"), exact("configure.ac")],
        dependency_manifests: &[],
        extensions: &["c", "h"],
        entry_points: &["main.c"],
        version_files: &[],
    },
    LanguageSpec {
        language: Language::Ruby,
        manifests: &[exact("Gemfile"), FilePattern::Suffix(".gemspec")],
        dependency_manifests: &[manifest(exact("Gemfile"), ManifestFormat::Gemfile)],
        extensions: &["rb"],
        entry_points: &["main.rb", "app.rb", "config.ru"],
        version_files: &[version(FilePattern::Suffix(".gemspec"), VersionFormat::Gemspec)],
    },
    LanguageSpec {
        language: Language::Php,
        manifests: &[exact("composer.json")],
        dependency_manifests: &[manifest(exact("composer.json"), ManifestFormat::Composer)],
        extensions: &["php"],
        entry_points: &["index.php"],
        version_files: &[version(exact("composer.json"), VersionFormat::JsonVersion)],
    },
    LanguageSpec {
        language: Language::Swift,
        manifests: &[exact("Package.swift")],
        dependency_manifests: &[manifest(exact("Package.swift"), ManifestFormat::SwiftPackage)],
        extensions: &["swift"],
        entry_points: &["main.swift"],
        version_files: &[],
    },
];

/// Version files consulted for every language, after the language's own.
pub static GENERIC_VERSION_FILES: &[VersionSource] = &[
    version(exact("VERSION"), VersionFormat::PlainText),
    version(exact("version.txt"), VersionFormat::PlainText),
];

/// Version-control marker names.
pub const VCS_MARKERS: &[&str] = &[".git", ".hg", ".svn", ".bzr"];

/// Readme candidates, matched case-insensitively.
pub const README_NAMES: &[&str] = &[
    "README.md",
    "README.rst",
    "README.txt",
    "README.markdown",
    "README",
];

/// Directories never descended into: VCS internals, installed
/// dependencies and build output.
pub const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".bzr",
    "node_modules",
    "bower_components",
    "vendor",
    "venv",
    ".venv",
    "env",
    "site-packages",
    ".tox",
    "Pods",
    "target",
    "build",
    "dist",
    "out",
    "bin",
    "obj",
    "__pycache__",
    ".gradle",
    ".next",
    ".nuxt",
    "coverage",
    ".mypy_cache",
    ".pytest_cache",
];

static EXTENSION_INDEX: LazyLock<FxHashMap<&'static str, Language>> = LazyLock::new(|| {
    let mut index = FxHashMap::default();
    for spec in LANGUAGES {
        for ext in spec.extensions {
            index.entry(*ext).or_insert(spec.language);
        }
    }
    index
});

/// Returns the registry entry for `language`.
#[must_use]
pub fn spec_for(language: Language) -> Option<&'static LanguageSpec> {
    LANGUAGES.iter().find(|spec| spec.language == language)
}

/// Returns the registry position of `language`; lower wins ties.
#[must_use]
pub fn priority(language: Language) -> usize {
    LANGUAGES
        .iter()
        .position(|spec| spec.language == language)
        .unwrap_or(usize::MAX)
}

/// Maps a file extension (without the dot, any case) to its language.
#[must_use]
pub fn language_for_extension(ext: &str) -> Option<Language> {
    EXTENSION_INDEX.get(ext.to_ascii_lowercase().as_str()).copied()
}

/// Languages whose manifest patterns match `file_name`.
pub fn manifest_languages(file_name: &str) -> impl Iterator<Item = Language> + '_ {
    LANGUAGES
        .iter()
        .filter(move |spec| spec.manifests.iter().any(|p| p.matches(file_name)))
        .map(|spec| spec.language)
}

/// Returns the first language whose entry points include `file_name`.
#[must_use]
pub fn entry_point_language(file_name: &str) -> Option<Language> {
    LANGUAGES
        .iter()
        .find(|spec| spec.entry_points.iter().any(|e| *e == file_name))
        .map(|spec| spec.language)
}

/// Returns `true` if `name` is a version-control marker.
#[must_use]
pub fn is_vcs_marker(name: &str) -> bool {
    VCS_MARKERS.contains(&name)
}

/// Returns `true` if `name` is a readme candidate.
#[must_use]
pub fn is_readme(name: &str) -> bool {
    README_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// Returns `true` if a directory called `name` is in the built-in
/// exclusion set.
#[must_use]
pub fn is_excluded_dir(name: &str) -> bool {
    EXCLUDED_DIRS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_matches_language_priority() {
        let order: Vec<Language> = LANGUAGES.iter().map(|s| s.language).collect();
        assert_eq!(order, Language::ALL.to_vec());
        assert!(priority(Language::Rust) < priority(Language::Swift));
    }

    #[test]
    fn test_file_pattern_matching() {
        assert!(FilePattern::Exact("Cargo.toml").matches("cargo.TOML"));
        assert!(!FilePattern::Exact("Cargo.toml").matches("Cargo.lock"));
        assert!(FilePattern::Suffix(".csproj").matches("App.CSPROJ"));
        assert!(!FilePattern::Suffix(".csproj").matches(".csproj"));
    }

    #[test]
    fn test_extension_lookup() {
        assert_eq!(language_for_extension("py"), Some(Language::Python));
        assert_eq!(language_for_extension("TSX"), Some(Language::TypeScript));
        assert_eq!(language_for_extension("h"), Some(Language::C));
        assert_eq!(language_for_extension("md"), None);
    }

    #[test]
    fn test_manifest_languages() {
        let langs: Vec<_> = manifest_languages("package.json").collect();
        assert_eq!(langs, vec![Language::JavaScript]);
        let langs: Vec<_> = manifest_languages("Widget.csproj").collect();
        assert_eq!(langs, vec![Language::CSharp]);
        assert_eq!(manifest_languages("notes.txt").count(), 0);
    }

    #[test]
    fn test_markers() {
        assert!(is_vcs_marker(".git"));
        assert!(!is_vcs_marker("git"));
        assert!(is_readme("readme.MD"));
        assert!(is_excluded_dir("vendor"));
        assert!(!is_excluded_dir("src"));
        assert_eq!(entry_point_language("main.py"), Some(Language::Python));
    }
}
