//! Project categories and tag normalisation.
//!
//! Categories are user fields. A record starts out in
//! [`DEFAULT_CATEGORY`] and may be moved into one of the
//! [`PREDEFINED_CATEGORIES`] or a custom category defined by the user.

use serde::{Deserialize, Serialize};

use crate::Language;

/// The category every newly discovered project starts in.
pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// Maximum length of a normalised tag, in characters.
pub const MAX_TAG_LEN: usize = 50;

/// A category that ships with the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinCategory {
    /// Stable key stored in the category side table.
    pub key: &'static str,
    /// Display name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Lowercase keywords used by [`suggest_category`].
    pub keywords: &'static [&'static str],
}

/// The built-in categories, in suggestion tie-break order.
pub const PREDEFINED_CATEGORIES: &[BuiltinCategory] = &[
    BuiltinCategory {
        key: "web",
        name: "Web",
        description: "Web applications and websites",
        keywords: &[
            "web", "website", "http", "html", "css", "javascript", "react", "vue", "angular",
            "django", "flask", "fastapi",
        ],
    },
    BuiltinCategory {
        key: "desktop",
        name: "Desktop",
        description: "Desktop applications",
        keywords: &[
            "desktop", "gui", "pyside", "pyqt", "tkinter", "wx", "electron", "winforms", "wpf",
        ],
    },
    BuiltinCategory {
        key: "mobile",
        name: "Mobile",
        description: "Mobile applications",
        keywords: &[
            "mobile", "android", "ios", "flutter", "react-native", "kotlin", "swift", "cordova",
        ],
    },
    BuiltinCategory {
        key: "library",
        name: "Library",
        description: "Libraries and frameworks",
        keywords: &["library", "framework", "sdk", "api", "package", "module", "lib"],
    },
    BuiltinCategory {
        key: "tool",
        name: "Tool",
        description: "Command-line tools and utilities",
        keywords: &["tool", "utility", "cli", "script", "automation", "batch", "shell"],
    },
    BuiltinCategory {
        key: "game",
        name: "Game",
        description: "Games and game development",
        keywords: &["game", "pygame", "unity", "unreal", "godot", "engine", "gaming"],
    },
    BuiltinCategory {
        key: "data",
        name: "Data",
        description: "Data science and machine learning",
        keywords: &[
            "data", "ml", "ai", "machine", "learning", "pandas", "numpy", "tensorflow", "pytorch",
            "scikit",
        ],
    },
    BuiltinCategory {
        key: "devops",
        name: "DevOps",
        description: "DevOps and infrastructure",
        keywords: &[
            "devops", "docker", "kubernetes", "ci", "cd", "jenkins", "github-actions", "terraform",
        ],
    },
    BuiltinCategory {
        key: "system",
        name: "System",
        description: "System programming and low-level tools",
        keywords: &["system", "kernel", "driver", "embedded", "firmware", "os", "operating"],
    },
    BuiltinCategory {
        key: "other",
        name: "Other",
        description: "Other project types",
        keywords: &[],
    },
];

/// An owned category definition, either built in or user-defined.
///
/// Custom categories are persisted in the category side table; built-in
/// ones are converted with [`CategoryDef::builtin`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDef {
    /// Stable key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// One-line description.
    #[serde(default)]
    pub description: String,
    /// Lowercase keywords for suggestion scoring.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl CategoryDef {
    /// Returns every built-in category as an owned definition.
    #[must_use]
    pub fn builtin() -> Vec<Self> {
        PREDEFINED_CATEGORIES.iter().map(Self::from).collect()
    }

    /// Returns `true` if `key` names a built-in category or the default.
    #[must_use]
    pub fn is_builtin_key(key: &str) -> bool {
        key == DEFAULT_CATEGORY || PREDEFINED_CATEGORIES.iter().any(|c| c.key == key)
    }
}

impl From<&BuiltinCategory> for CategoryDef {
    fn from(c: &BuiltinCategory) -> Self {
        Self {
            key: c.key.to_owned(),
            name: c.name.to_owned(),
            description: c.description.to_owned(),
            keywords: c.keywords.iter().map(|k| (*k).to_owned()).collect(),
        }
    }
}

/// Normalises a user-supplied tag.
///
/// Trims, lowercases, drops everything except letters, digits, `_`, `-` and
/// whitespace, collapses whitespace runs into one space and truncates to
/// [`MAX_TAG_LEN`] characters. Returns `None` if nothing is left.
///
/// # Examples
///
/// ```
/// use prj_core::normalize_tag;
///
/// assert_eq!(normalize_tag("  Web   API! ").as_deref(), Some("web api"));
/// assert_eq!(normalize_tag("C++"), Some("c".to_owned()));
/// assert_eq!(normalize_tag("!!!"), None);
/// ```
#[must_use]
pub fn normalize_tag(raw: &str) -> Option<String> {
    let kept: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_' || *c == '-')
        .collect();

    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(MAX_TAG_LEN).collect();
    let tag = truncated.trim_end();

    (!tag.is_empty()).then(|| tag.to_owned())
}

/// Suggests a category by keyword scoring.
///
/// Every keyword found in `"{name} {description} {language}"` scores one
/// point; a category that lists the language itself as a keyword scores two
/// more. The highest score wins, earlier categories win ties, and `None` is
/// returned when nothing matches.
///
/// # Examples
///
/// ```
/// use prj_core::{suggest_category, CategoryDef, Language};
///
/// let categories = CategoryDef::builtin();
/// let key = suggest_category("flask-blog", "A small web site", Some(Language::Python), &categories);
/// assert_eq!(key, Some("web"));
/// ```
#[must_use]
pub fn suggest_category<'a>(
    name: &str,
    description: &str,
    language: Option<Language>,
    categories: &'a [CategoryDef],
) -> Option<&'a str> {
    let language = language.map(|l| l.label().to_lowercase()).unwrap_or_default();
    let text = format!("{name} {description} {language}").to_lowercase();

    let mut best: Option<(&'a str, usize)> = None;
    for category in categories {
        let mut score = category
            .keywords
            .iter()
            .filter(|k| text.contains(k.to_lowercase().as_str()))
            .count();
        if !language.is_empty() && category.keywords.iter().any(|k| *k == language) {
            score += 2;
        }
        if score > 0 && best.is_none_or(|(_, top)| score > top) {
            best = Some((category.key.as_str(), score));
        }
    }

    best.map(|(key, _)| key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("Core").as_deref(), Some("core"));
        assert_eq!(normalize_tag("my_tag-2").as_deref(), Some("my_tag-2"));
        assert_eq!(normalize_tag("a\t\tb").as_deref(), Some("a b"));
        assert_eq!(normalize_tag(""), None);
        assert_eq!(normalize_tag("   "), None);
    }

    #[test]
    fn test_normalize_tag_truncates() {
        let long = "x".repeat(80);
        assert_eq!(normalize_tag(&long).map(|t| t.len()), Some(MAX_TAG_LEN));
    }

    #[test]
    fn test_builtin_keys() {
        assert!(CategoryDef::is_builtin_key("web"));
        assert!(CategoryDef::is_builtin_key(DEFAULT_CATEGORY));
        assert!(!CategoryDef::is_builtin_key("homelab"));
        assert_eq!(CategoryDef::builtin().len(), PREDEFINED_CATEGORIES.len());
    }

    #[test]
    fn test_suggest_language_bonus() {
        let categories = CategoryDef::builtin();
        assert_eq!(
            suggest_category("notes", "", Some(Language::Kotlin), &categories),
            Some("mobile")
        );
    }

    #[test]
    fn test_suggest_none_when_no_keywords() {
        let categories = CategoryDef::builtin();
        assert_eq!(suggest_category("zzz", "", None, &categories), None);
    }

    #[test]
    fn test_suggest_custom_category() {
        let mut categories = CategoryDef::builtin();
        categories.push(CategoryDef {
            key: "homelab".to_owned(),
            name: "Homelab".to_owned(),
            description: String::new(),
            keywords: vec!["proxmox".to_owned(), "homelab".to_owned()],
        });
        assert_eq!(
            suggest_category("proxmox-homelab-scripts", "", None, &categories),
            Some("homelab")
        );
    }
}
