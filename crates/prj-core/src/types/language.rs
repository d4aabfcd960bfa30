//! Primary language tags.
//!
//! This module provides the [`Language`] enum used to label the primary
//! language of a discovered project. The scanner's language registry maps
//! each variant to its manifests, extensions and version files.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The primary programming language of a project.
///
/// A project whose language cannot be determined carries `None` in
/// [`ScanFacts::language`](crate::ScanFacts::language); there is no
/// `Unknown` variant.
///
/// # Examples
///
/// ```
/// use prj_core::Language;
///
/// assert_eq!(Language::Rust.label(), "Rust");
/// assert_eq!(Language::from_label("c#"), Some(Language::CSharp));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Language {
    /// Rust (`Cargo.toml`).
    Rust,
    /// Go (`go.mod`).
    Go,
    /// TypeScript (`tsconfig.json`).
    #[serde(rename = "typescript")]
    TypeScript,
    /// JavaScript (`package.json`).
    #[serde(rename = "javascript")]
    JavaScript,
    /// Python (`pyproject.toml`, `requirements.txt`, `setup.py`).
    Python,
    /// Java (`pom.xml`, `build.gradle`).
    Java,
    /// Kotlin (`build.gradle.kts`).
    Kotlin,
    /// C# (`*.csproj`, `*.sln`).
    #[serde(rename = "csharp")]
    CSharp,
    /// C++ (`CMakeLists.txt`, `vcpkg.json`).
    Cpp,
    /// C (`Makefile`, `meson.build`).
    C,
    /// Ruby (`Gemfile`).
    Ruby,
    /// PHP (`composer.json`).
    Php,
    /// Swift (`Package.swift`).
    Swift,
}

impl Language {
    /// Every language, in registry priority order.
    pub const ALL: [Self; 13] = [
        Self::Rust,
        Self::Go,
        Self::TypeScript,
        Self::JavaScript,
        Self::Python,
        Self::Java,
        Self::Kotlin,
        Self::CSharp,
        Self::Cpp,
        Self::C,
        Self::Ruby,
        Self::Php,
        Self::Swift,
    ];

    /// Returns a human-readable label for this language.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rust => "Rust",
            Self::Go => "Go",
            Self::TypeScript => "TypeScript",
            Self::JavaScript => "JavaScript",
            Self::Python => "Python",
            Self::Java => "Java",
            Self::Kotlin => "Kotlin",
            Self::CSharp => "C#",
            Self::Cpp => "C++",
            Self::C => "C",
            Self::Ruby => "Ruby",
            Self::Php => "PHP",
            Self::Swift => "Swift",
        }
    }

    /// Parses a label case-insensitively, accepting both the display label
    /// and the serialized form (`"c#"`, `"csharp"`, `"c++"`, `"cpp"`).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|lang| {
            lang.label().to_ascii_lowercase() == wanted || lang.key() == wanted
        })
    }

    /// The serialized key of this language.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Go => "go",
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
            Self::Python => "python",
            Self::Java => "java",
            Self::Kotlin => "kotlin",
            Self::CSharp => "csharp",
            Self::Cpp => "cpp",
            Self::C => "c",
            Self::Ruby => "ruby",
            Self::Php => "php",
            Self::Swift => "swift",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_labels() {
        assert_eq!(Language::CSharp.label(), "C#");
        assert_eq!(Language::Cpp.to_string(), "C++");
        assert_eq!(Language::Php.label(), "PHP");
    }

    #[test]
    fn test_language_from_label() {
        assert_eq!(Language::from_label("rust"), Some(Language::Rust));
        assert_eq!(Language::from_label(" TypeScript "), Some(Language::TypeScript));
        assert_eq!(Language::from_label("c++"), Some(Language::Cpp));
        assert_eq!(Language::from_label("cpp"), Some(Language::Cpp));
        assert_eq!(Language::from_label("cobol"), None);
    }

    #[test]
    fn test_language_serialization_matches_key() {
        for lang in Language::ALL {
            let json = serde_json::to_string(&lang).unwrap();
            assert_eq!(json, format!("\"{}\"", lang.key()));
        }
    }
}
