//! pyproject.toml discovery and project metadata
//!
//! Reads the Poetry `[tool.poetry]` table first and falls back to the
//! PEP 621 `[project]` table for every field.

use crate::errors::ConfigError;
use crate::settings::{PackageInfoSettings, TOOL_SECTION};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PYPROJECT_FILE: &str = "pyproject.toml";

/// Find pyproject.toml by searching `start` and then each of its ancestors
///
/// Relative starts (including `.`) are resolved against the current directory
/// first so the search can climb above them.
pub fn find_pyproject_toml_path(start: &Path) -> Option<PathBuf> {
    let start = fs::canonicalize(start)
        .or_else(|_| std::path::absolute(start))
        .unwrap_or_else(|_| start.to_path_buf());
    let mut seen = HashSet::new();

    for candidate in start.ancestors() {
        let candidate = candidate.to_path_buf();
        if !seen.insert(candidate.clone()) {
            continue;
        }

        let pyproject = candidate.join(PYPROJECT_FILE);
        if pyproject.is_file() {
            return Some(pyproject);
        }
    }

    None
}

/// A loaded pyproject.toml document
#[derive(Debug, Clone)]
pub struct PyProject {
    pub path: PathBuf,
    pub document: toml::Table,
}

impl PyProject {
    /// Locate pyproject.toml from `start` upward and load it
    pub fn discover(start: &Path) -> Result<Self, ConfigError> {
        let path = find_pyproject_toml_path(start)
            .ok_or_else(|| ConfigError::PyProjectNotFound(start.to_path_buf()))?;
        Self::load(&path)
    }

    /// Load a pyproject.toml file from an explicit path
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading pyproject from {:?}", path);
        let content = fs::read_to_string(path)?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let document: toml::Table = toml::from_str(content)?;
        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    /// Directory containing pyproject.toml; all configured paths are relative to it
    pub fn root_dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    /// Decode `[tool.package-info]`
    pub fn settings(&self) -> Result<PackageInfoSettings, ConfigError> {
        let section = self
            .document
            .get("tool")
            .and_then(|tool| tool.get(TOOL_SECTION));
        PackageInfoSettings::from_value(section)
    }

    /// Extract the project metadata fields
    pub fn metadata(&self) -> ProjectMetadata {
        ProjectMetadata::from_document(&self.document)
    }
}

/// Project fields exposed through the `project` generator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectMetadata {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub maintainers: Vec<String>,
    pub license: Option<String>,
    pub classifiers: Vec<String>,
    pub keywords: Vec<String>,
    pub documentation: Option<String>,
    pub repository: Option<String>,
    pub homepage: Option<String>,
}

impl ProjectMetadata {
    pub fn from_document(document: &toml::Table) -> Self {
        let poetry = document
            .get("tool")
            .and_then(|t| t.get("poetry"))
            .and_then(|p| p.as_table());
        let project = document.get("project").and_then(|p| p.as_table());

        let string = |key: &str| {
            poetry
                .and_then(|t| t.get(key))
                .and_then(|v| v.as_str())
                .or_else(|| project.and_then(|t| t.get(key)).and_then(|v| v.as_str()))
                .map(str::to_string)
        };

        let list = |key: &str| {
            poetry
                .and_then(|t| t.get(key))
                .or_else(|| project.and_then(|t| t.get(key)))
                .map(people_or_strings)
                .unwrap_or_default()
        };

        let url = |key: &str| {
            poetry
                .and_then(|t| t.get(key))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .or_else(|| project_url(project, key))
        };

        let license = poetry
            .and_then(|t| t.get("license"))
            .or_else(|| project.and_then(|t| t.get("license")))
            .and_then(license_text);

        Self {
            name: string("name"),
            version: string("version"),
            description: string("description"),
            authors: list("authors"),
            maintainers: list("maintainers"),
            license,
            classifiers: list("classifiers"),
            keywords: list("keywords"),
            documentation: url("documentation"),
            repository: url("repository"),
            homepage: url("homepage"),
        }
    }

    /// Project name, required for default paths and artifact names
    pub fn require_name(&self) -> Result<&str, ConfigError> {
        self.name
            .as_deref()
            .ok_or_else(|| ConfigError::MissingProjectField("name".to_string()))
    }

    pub fn require_version(&self) -> Result<&str, ConfigError> {
        self.version
            .as_deref()
            .ok_or_else(|| ConfigError::MissingProjectField("version".to_string()))
    }
}

/// Strings stay as-is; PEP 621 `{ name, email }` tables become `Name <email>`
fn people_or_strings(value: &toml::Value) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Table(t) => {
                let name = t.get("name").and_then(|v| v.as_str());
                let email = t.get("email").and_then(|v| v.as_str());
                match (name, email) {
                    (Some(name), Some(email)) => Some(format!("{} <{}>", name, email)),
                    (Some(name), None) => Some(name.to_string()),
                    (None, Some(email)) => Some(format!("<{}>", email)),
                    (None, None) => None,
                }
            }
            _ => None,
        })
        .collect()
}

fn license_text(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Table(t) => t
            .get("text")
            .or_else(|| t.get("file"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
        _ => None,
    }
}

fn project_url(project: Option<&toml::Table>, key: &str) -> Option<String> {
    project
        .and_then(|p| p.get("urls"))
        .and_then(|u| u.as_table())
        .and_then(|urls| {
            urls.iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(key))
                .and_then(|(_, v)| v.as_str())
                .map(str::to_string)
        })
}

/// Distribution file name stem, e.g. `My.Package-name` -> `my_package_name`
pub fn distribution_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_separator = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !last_was_separator {
                out.push('_');
            }
            last_was_separator = true;
        } else {
            out.extend(c.to_lowercase());
            last_was_separator = false;
        }
    }
    out
}

/// PEP 440 normal form of a version as it appears in artifact file names,
/// e.g. `1.0.0-beta.1` -> `1.0.0b1`. Unparseable versions are returned as-is.
pub fn normalized_version(version: &str) -> String {
    match version.trim().parse::<pep440_rs::Version>() {
        Ok(parsed) => parsed.to_string(),
        Err(e) => {
            debug!("Version {:?} is not PEP 440 ({}), using it verbatim", version, e);
            version.to_string()
        }
    }
}

/// Import-style module directory for a project name
pub fn module_name(name: &str) -> String {
    name.replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const POETRY_PYPROJECT: &str = r#"
[tool.poetry]
name = "demo-app"
version = "1.2.3"
description = "A demo"
authors = ["Ada Lovelace <ada@example.com>"]
license = "MIT"
keywords = ["demo", "info"]
homepage = "https://example.com"

[tool.package-info]
patch-build-formats = "wheel"
"#;

    const PEP621_PYPROJECT: &str = r#"
[project]
name = "demo"
version = "0.4.0"
authors = [{ name = "Grace Hopper", email = "grace@example.com" }, { name = "Anon" }]
license = { text = "Apache-2.0" }
classifiers = ["Programming Language :: Python :: 3"]

[project.urls]
Repository = "https://example.com/demo.git"
Documentation = "https://docs.example.com"
"#;

    #[test]
    fn test_poetry_metadata() {
        let Ok(pyproject) = PyProject::parse(Path::new("pyproject.toml"), POETRY_PYPROJECT) else {
            panic!("valid pyproject");
        };
        let meta = pyproject.metadata();
        assert_eq!(meta.name.as_deref(), Some("demo-app"));
        assert_eq!(meta.version.as_deref(), Some("1.2.3"));
        assert_eq!(meta.authors, vec!["Ada Lovelace <ada@example.com>"]);
        assert_eq!(meta.license.as_deref(), Some("MIT"));
        assert_eq!(meta.keywords, vec!["demo", "info"]);
        assert_eq!(meta.homepage.as_deref(), Some("https://example.com"));
        assert_eq!(meta.repository, None);
        assert!(meta.maintainers.is_empty());
    }

    #[test]
    fn test_pep621_metadata() {
        let Ok(pyproject) = PyProject::parse(Path::new("pyproject.toml"), PEP621_PYPROJECT) else {
            panic!("valid pyproject");
        };
        let meta = pyproject.metadata();
        assert_eq!(meta.name.as_deref(), Some("demo"));
        assert_eq!(
            meta.authors,
            vec!["Grace Hopper <grace@example.com>", "Anon"]
        );
        assert_eq!(meta.license.as_deref(), Some("Apache-2.0"));
        assert_eq!(
            meta.repository.as_deref(),
            Some("https://example.com/demo.git")
        );
        assert_eq!(
            meta.documentation.as_deref(),
            Some("https://docs.example.com")
        );
        assert_eq!(meta.classifiers.len(), 1);
    }

    #[test]
    fn test_settings_from_tool_section() {
        let Ok(pyproject) = PyProject::parse(Path::new("pyproject.toml"), POETRY_PYPROJECT) else {
            panic!("valid pyproject");
        };
        let settings = pyproject.settings();
        assert!(settings.is_ok_and(|s| s.patch_build_formats.len() == 1));
    }

    #[test]
    fn test_find_pyproject_from_nested_directory() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let nested = temp_dir.path().join("demo").join("sub");
        assert!(fs::create_dir_all(&nested).is_ok());
        assert!(fs::write(temp_dir.path().join(PYPROJECT_FILE), POETRY_PYPROJECT).is_ok());

        let Ok(root) = fs::canonicalize(temp_dir.path()) else {
            return;
        };
        let found = find_pyproject_toml_path(&nested);
        assert_eq!(found, Some(root.join(PYPROJECT_FILE)));

        let loaded = PyProject::discover(&nested);
        assert!(loaded.is_ok_and(|p| p.root_dir() == root));
    }

    #[test]
    fn test_find_pyproject_resolves_parent_components() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let sibling = temp_dir.path().join("sibling");
        let target = temp_dir.path().join("target").join("pkg");
        assert!(fs::create_dir_all(&sibling).is_ok());
        assert!(fs::create_dir_all(&target).is_ok());
        assert!(fs::write(temp_dir.path().join("target").join(PYPROJECT_FILE), POETRY_PYPROJECT).is_ok());
        assert!(fs::write(sibling.join(PYPROJECT_FILE), POETRY_PYPROJECT).is_ok());

        // read literally, the ancestors of sibling/../target/pkg include sibling
        let start = sibling.join("..").join("target").join("pkg");
        let Ok(expected) = fs::canonicalize(temp_dir.path().join("target").join(PYPROJECT_FILE))
        else {
            return;
        };
        assert_eq!(find_pyproject_toml_path(&start), Some(expected));
    }

    #[test]
    fn test_missing_name_is_an_error() {
        let meta = ProjectMetadata::default();
        assert!(matches!(
            meta.require_name(),
            Err(ConfigError::MissingProjectField(_))
        ));
    }

    #[test]
    fn test_distribution_name() {
        assert_eq!(distribution_name("My.Package--name"), "my_package_name");
        assert_eq!(distribution_name("demo"), "demo");
        assert_eq!(module_name("demo-app"), "demo_app");
    }

    #[test]
    fn test_normalized_version() {
        assert_eq!(normalized_version("1.2.3"), "1.2.3");
        assert_eq!(normalized_version("1.0.0-beta.1"), "1.0.0b1");
        assert_eq!(normalized_version("2.0RC2"), "2.0rc2");
        assert_eq!(normalized_version("1.0-post1"), "1.0.post1");
        assert_eq!(normalized_version("not a version"), "not a version");
    }
}
