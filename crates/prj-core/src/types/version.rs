//! Project version strings.
//!
//! A version read from a project's declaration file is kept verbatim as a
//! [`ProjectVersion`]. When the raw string has the
//! `MAJOR.MINOR.PATCH[-pre][+build]` shape it is also parsed into a
//! [`SemanticVersion`] and the version is called *canonical*. Anything else
//! (`"v1.2"`, `"1.0-SNAPSHOT"`, `"latest"`) is retained as-is and flagged
//! non-canonical rather than discarded.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A parsed `MAJOR.MINOR.PATCH[-pre][+build]` version.
///
/// # Examples
///
/// ```
/// use prj_core::SemanticVersion;
///
/// let v = SemanticVersion::parse("2.3.1-beta.2+build.7").unwrap();
/// assert_eq!((v.major, v.minor, v.patch), (2, 3, 1));
/// assert_eq!(v.pre.as_deref(), Some("beta.2"));
/// assert_eq!(v.build.as_deref(), Some("build.7"));
///
/// assert!(SemanticVersion::parse("1.2").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticVersion {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
    /// Pre-release suffix without the leading `-`.
    pub pre: Option<String>,
    /// Build metadata without the leading `+`.
    pub build: Option<String>,
}

impl SemanticVersion {
    /// Parses a strict semantic version string.
    ///
    /// Returns `None` when the input does not have exactly three numeric
    /// components, when a component has a leading zero, or when a suffix
    /// contains an empty or non-alphanumeric identifier.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let (rest, build) = match input.split_once('+') {
            Some((rest, build)) => (rest, Some(build)),
            None => (input, None),
        };
        let (core, pre) = match rest.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (rest, None),
        };

        let mut parts = core.split('.');
        let major = parse_numeric(parts.next()?)?;
        let minor = parse_numeric(parts.next()?)?;
        let patch = parse_numeric(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }

        if pre.is_some_and(|p| !valid_identifiers(p)) || build.is_some_and(|b| !valid_identifiers(b))
        {
            return None;
        }

        Some(Self {
            major,
            minor,
            patch,
            pre: pre.map(ToOwned::to_owned),
            build: build.map(ToOwned::to_owned),
        })
    }

    /// Returns the `(major, minor, patch)` triple.
    #[inline]
    #[must_use]
    pub const fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

fn parse_numeric(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if part.len() > 1 && part.starts_with('0') {
        return None;
    }
    part.parse().ok()
}

fn valid_identifiers(suffix: &str) -> bool {
    suffix
        .split('.')
        .all(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-'))
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

/// A version string as declared by a project.
///
/// Serialises as the bare raw string; the semantic form is recomputed on
/// deserialisation so the persisted file never carries derived data.
///
/// # Examples
///
/// ```
/// use prj_core::ProjectVersion;
///
/// let v = ProjectVersion::parse("2.3.1");
/// assert!(v.is_canonical());
/// assert_eq!(v.semver().map(|s| s.triple()), Some((2, 3, 1)));
///
/// let v = ProjectVersion::parse("v1.2");
/// assert!(!v.is_canonical());
/// assert_eq!(v.raw(), "v1.2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ProjectVersion {
    raw: String,
    semver: Option<SemanticVersion>,
}

impl ProjectVersion {
    /// Builds a version from a raw declaration, trimming surrounding
    /// whitespace and quotes.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        Self {
            semver: SemanticVersion::parse(raw),
            raw: raw.to_owned(),
        }
    }

    /// The version exactly as declared.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The parsed semantic version, if the raw string is canonical.
    #[inline]
    #[must_use]
    pub const fn semver(&self) -> Option<&SemanticVersion> {
        self.semver.as_ref()
    }

    /// Returns `true` if the raw string is a canonical semantic version.
    #[inline]
    #[must_use]
    pub const fn is_canonical(&self) -> bool {
        self.semver.is_some()
    }
}

impl From<String> for ProjectVersion {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<ProjectVersion> for String {
    fn from(version: ProjectVersion) -> Self {
        version.raw
    }
}

impl fmt::Display for ProjectVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_triple() {
        let v = SemanticVersion::parse("2.3.1").unwrap();
        assert_eq!(v.triple(), (2, 3, 1));
        assert!(v.pre.is_none());
        assert!(v.build.is_none());
        assert_eq!(v.to_string(), "2.3.1");
    }

    #[test]
    fn test_parse_suffixes() {
        let v = SemanticVersion::parse("1.0.0-rc.1").unwrap();
        assert_eq!(v.pre.as_deref(), Some("rc.1"));

        let v = SemanticVersion::parse("1.0.0+20240101").unwrap();
        assert_eq!(v.build.as_deref(), Some("20240101"));

        let v = SemanticVersion::parse("0.9.12-alpha-2+sha.5114f85").unwrap();
        assert_eq!(v.pre.as_deref(), Some("alpha-2"));
        assert_eq!(v.to_string(), "0.9.12-alpha-2+sha.5114f85");
    }

    #[test]
    fn test_parse_rejects_non_conforming() {
        for raw in [
            "", "1", "1.2", "1.2.3.4", "v1.2.3", "01.2.3", "1.2.x", "1.2.3-", "1.2.3+", "1.2.3-a..b",
            "latest",
        ] {
            assert!(SemanticVersion::parse(raw).is_none(), "{raw} should not parse");
        }
    }

    #[test]
    fn test_non_canonical_kept_verbatim() {
        let v = ProjectVersion::parse("1.0-SNAPSHOT");
        assert!(!v.is_canonical());
        assert_eq!(v.raw(), "1.0-SNAPSHOT");
        assert!(v.semver().is_none());
    }

    #[test]
    fn test_parse_trims_quotes() {
        let v = ProjectVersion::parse("  \"4.5.6\" ");
        assert_eq!(v.raw(), "4.5.6");
        assert!(v.is_canonical());
    }

    #[test]
    fn test_serializes_as_raw_string() {
        let v = ProjectVersion::parse("2.3.1");
        let json = serde_json::to_string(&v).unwrap();
        insta::assert_snapshot!(json, @r#""2.3.1""#);

        let back: ProjectVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
        assert!(back.is_canonical());
    }
}
