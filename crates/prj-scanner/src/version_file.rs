//! Version declaration readers.
//!
//! Each [`VersionFormat`] knows how to pull the project's own version out
//! of one kind of file. A file that parses but declares nothing yields
//! `Ok(None)`; a file that cannot be read or parsed yields an error the
//! extractor turns into a diagnostic.

use std::sync::LazyLock;

use camino::Utf8Path;
use regex::Regex;

use crate::error::ScanError;
use crate::registry::VersionFormat;

static PY_DUNDER_VERSION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*__version__\s*=\s*["']([^"']+)["']"#).ok());

static PY_VERSION_KWARG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"\bversion\s*=\s*["']([^"']+)["']"#).ok());

static GRADLE_VERSION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*version\s*=?\s*["']([^"']+)["']"#).ok());

static GEMSPEC_VERSION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*\w+\.version\s*=\s*["']([^"']+)["']"#).ok());

static CSPROJ_VERSION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"<Version>\s*([^<\s]+)\s*</Version>").ok());

static XML_VERSION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"<version>\s*([^<\s]+)\s*</version>").ok());

/// Blocks of a POM whose `<version>` elements belong to something other
/// than the project itself. Removed in this order before searching.
static POM_FOREIGN_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        "parent",
        "dependencyManagement",
        "build",
        "profiles",
        "reporting",
        "dependencies",
    ]
    .iter()
    .filter_map(|tag| Regex::new(&format!(r"(?s)<{tag}>.*?</{tag}>")).ok())
    .collect()
});

fn first_capture<'t>(re: &LazyLock<Option<Regex>>, text: &'t str) -> Option<&'t str> {
    let re = re.as_ref()?;
    re.captures(text)?.get(1).map(|m| m.as_str())
}

/// Reads the version declared by `path` in the given format.
///
/// # Errors
///
/// Returns [`ScanError::Read`] if the file cannot be read, or if a TOML or
/// JSON file does not parse.
pub fn read_version(path: &Utf8Path, format: VersionFormat) -> Result<Option<String>, ScanError> {
    let text = std::fs::read_to_string(path).map_err(|e| ScanError::read(path, e))?;
    parse_version(&text, format).map_err(|reason| {
        ScanError::read(path, std::io::Error::new(std::io::ErrorKind::InvalidData, reason))
    })
}

/// Extracts a version declaration from file contents.
///
/// # Errors
///
/// Returns a description of the syntax error for malformed TOML or JSON.
pub fn parse_version(text: &str, format: VersionFormat) -> Result<Option<String>, String> {
    let found = match format {
        VersionFormat::CargoToml => {
            let doc: toml::Table = text.parse().map_err(|e: toml::de::Error| e.to_string())?;
            doc.get("package")
                .and_then(|p| p.get("version"))
                .and_then(toml::Value::as_str)
                .map(ToOwned::to_owned)
        }
        VersionFormat::PyProject => {
            let doc: toml::Table = text.parse().map_err(|e: toml::de::Error| e.to_string())?;
            doc.get("project")
                .and_then(|p| p.get("version"))
                .or_else(|| {
                    doc.get("tool")
                        .and_then(|t| t.get("poetry"))
                        .and_then(|p| p.get("version"))
                })
                .and_then(toml::Value::as_str)
                .map(ToOwned::to_owned)
        }
        VersionFormat::JsonVersion => {
            let doc: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
            doc.get("version")
                .and_then(serde_json::Value::as_str)
                .map(ToOwned::to_owned)
        }
        VersionFormat::PythonAssign => first_capture(&PY_DUNDER_VERSION, text)
            .or_else(|| first_capture(&PY_VERSION_KWARG, text))
            .map(ToOwned::to_owned),
        VersionFormat::Gradle => first_capture(&GRADLE_VERSION, text).map(ToOwned::to_owned),
        VersionFormat::Gemspec => first_capture(&GEMSPEC_VERSION, text).map(ToOwned::to_owned),
        VersionFormat::CsProj => first_capture(&CSPROJ_VERSION, text).map(ToOwned::to_owned),
        VersionFormat::PomXml => {
            let mut own = text.to_owned();
            for block in POM_FOREIGN_BLOCKS.iter() {
                own = block.replace_all(&own, "").into_owned();
            }
            first_capture(&XML_VERSION, &own).map(ToOwned::to_owned)
        }
        VersionFormat::PlainText => text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(ToOwned::to_owned),
    };

    Ok(found.filter(|v| !v.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cargo_toml() {
        let text = "[package]\nname = \"demo\"\nversion = \"2.3.1\"\n";
        assert_eq!(
            parse_version(text, VersionFormat::CargoToml).unwrap().as_deref(),
            Some("2.3.1")
        );
    }

    #[test]
    fn test_cargo_workspace_inherited_is_none() {
        let text = "[package]\nname = \"demo\"\nversion.workspace = true\n";
        assert_eq!(parse_version(text, VersionFormat::CargoToml).unwrap(), None);
    }

    #[test]
    fn test_malformed_toml_is_error() {
        assert!(parse_version("[package\nversion=", VersionFormat::CargoToml).is_err());
    }

    #[test]
    fn test_pyproject_poetry() {
        let text = "[tool.poetry]\nname = \"x\"\nversion = \"0.4.0\"\n";
        assert_eq!(
            parse_version(text, VersionFormat::PyProject).unwrap().as_deref(),
            Some("0.4.0")
        );
    }

    #[test]
    fn test_package_json() {
        let text = r#"{"name": "web", "version": "1.0.0-beta.1"}"#;
        assert_eq!(
            parse_version(text, VersionFormat::JsonVersion).unwrap().as_deref(),
            Some("1.0.0-beta.1")
        );
        assert_eq!(parse_version("{}", VersionFormat::JsonVersion).unwrap(), None);
    }

    #[test]
    fn test_python_assign() {
        let text = "\"\"\"Package.\"\"\"\n__version__ = '3.2.1'\n";
        assert_eq!(
            parse_version(text, VersionFormat::PythonAssign).unwrap().as_deref(),
            Some("3.2.1")
        );
        let setup = "setup(name='x', version=\"0.0.9\", packages=[])";
        assert_eq!(
            parse_version(setup, VersionFormat::PythonAssign).unwrap().as_deref(),
            Some("0.0.9")
        );
    }

    #[test]
    fn test_pom_ignores_parent_and_dependencies() {
        let text = r"
<project>
  <parent><version>9.9.9</version></parent>
  <artifactId>app</artifactId>
  <version>1.4.0</version>
  <dependencies>
    <dependency><version>5.0.0</version></dependency>
  </dependencies>
</project>";
        assert_eq!(
            parse_version(text, VersionFormat::PomXml).unwrap().as_deref(),
            Some("1.4.0")
        );
    }

    #[test]
    fn test_gradle_and_gemspec() {
        assert_eq!(
            parse_version("group = 'a'\nversion = '0.1.0-SNAPSHOT'\n", VersionFormat::Gradle)
                .unwrap()
                .as_deref(),
            Some("0.1.0-SNAPSHOT")
        );
        assert_eq!(
            parse_version("  spec.version = \"2.0.0\"\n", VersionFormat::Gemspec)
                .unwrap()
                .as_deref(),
            Some("2.0.0")
        );
    }

    #[test]
    fn test_csproj_and_plain_text() {
        assert_eq!(
            parse_version("<Project><Version>4.1.0</Version></Project>", VersionFormat::CsProj)
                .unwrap()
                .as_deref(),
            Some("4.1.0")
        );
        assert_eq!(
            parse_version("\n  v7 \n", VersionFormat::PlainText).unwrap().as_deref(),
            Some("v7")
        );
    }
}
