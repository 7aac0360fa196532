//! Typed `[tool.package-info]` settings
//!
//! The raw TOML table is decoded once into [`PackageInfoSettings`]; every
//! default lives in its `Default` impl so downstream code never looks up
//! optional keys itself.

use crate::errors::ConfigError;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Name of the table under `[tool]` that holds the plugin settings
pub const TOOL_SECTION: &str = "package-info";

/// Default content formatter locator
pub const DEFAULT_FORMATTER: &str = "normalize";

/// PEP-8 recommends 79 columns.
pub const DEFAULT_LINE_LENGTH: usize = 79;

/// Properties emitted when the `properties` key is absent
pub const DEFAULT_PROPERTIES: &[&str] = &[
    "project-name",
    "project-description",
    "project-version",
    "project-authors",
    "project-license",
    "project-classifiers",
    "project-documentation",
    "project-repository",
    "project-homepage",
    "project-maintainers",
    "project-keywords",
    "git-commit-id",
    "git-commit-author-name",
    "git-commit-author-email",
    "git-commit-timestamp",
    "git-branch-name",
    "git-branch-path",
    "git-is-dirty",
    "git-is-dirty-excluding-untracked",
    "git-has-staged-changes",
    "git-has-unstaged-changes",
    "git-has-untracked-changes",
];

/// Decoded plugin settings with defaults applied
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PackageInfoSettings {
    /// Output path relative to the project root; derived from the project name when absent
    pub package_info_file_path: Option<PathBuf>,
    /// Generator key -> backend locator
    pub generators: BTreeMap<String, String>,
    pub properties: Vec<PropertyEntry>,
    pub formatter: String,
    pub template: Option<String>,
    pub line_separator: String,
    pub line_length: usize,
    #[serde(deserialize_with = "formats_from_string_or_list")]
    pub patch_build_formats: Vec<DistFormat>,
    pub patch_wheels: bool,
    pub git_search_parent_directories: bool,
}

impl Default for PackageInfoSettings {
    fn default() -> Self {
        let generators = [("git", "git"), ("project", "project")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Self {
            package_info_file_path: None,
            generators,
            properties: DEFAULT_PROPERTIES
                .iter()
                .map(|p| PropertyEntry::Compact((*p).to_string()))
                .collect(),
            formatter: DEFAULT_FORMATTER.to_string(),
            template: None,
            line_separator: "\n".to_string(),
            line_length: DEFAULT_LINE_LENGTH,
            patch_build_formats: Vec::new(),
            patch_wheels: false,
            git_search_parent_directories: false,
        }
    }
}

impl PackageInfoSettings {
    /// Decode settings from the `[tool.package-info]` value (absent -> defaults)
    pub fn from_value(value: Option<&toml::Value>) -> Result<Self, ConfigError> {
        match value {
            Some(value) => value.clone().try_into().map_err(ConfigError::Settings),
            None => Ok(Self::default()),
        }
    }

    /// Archive formats to patch after a build, folding in `patch-wheels`
    pub fn patch_formats(&self) -> Vec<DistFormat> {
        let mut formats = self.patch_build_formats.clone();
        if self.patch_wheels && !formats.contains(&DistFormat::Wheel) {
            formats.push(DistFormat::Wheel);
        }
        formats
    }

    /// Whether the given concrete format should be patched
    pub fn should_patch(&self, format: DistFormat) -> bool {
        let formats = self.patch_formats();
        formats.contains(&DistFormat::All) || formats.contains(&format)
    }
}

/// One entry of the `properties` array
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PropertyEntry {
    /// `"<generator>-<property>"`
    Compact(String),
    /// `{ property-generator = "...", property-name = "...", ... }`
    Expanded(ExpandedPropertyEntry),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ExpandedPropertyEntry {
    pub property_generator: Option<String>,
    pub property_name: Option<String>,
    pub variable_name: Option<String>,
    #[serde(default)]
    pub metadata: toml::Table,
}

/// Distribution archive format produced by a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DistFormat {
    Wheel,
    Sdist,
    All,
}

impl DistFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DistFormat::Wheel => "wheel",
            DistFormat::Sdist => "sdist",
            DistFormat::All => "all",
        }
    }

    /// Concrete formats selected by this selector, in build order
    pub fn expand(self) -> Vec<DistFormat> {
        match self {
            DistFormat::All => vec![DistFormat::Sdist, DistFormat::Wheel],
            other => vec![other],
        }
    }
}

impl fmt::Display for DistFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wheel" => Ok(DistFormat::Wheel),
            "sdist" => Ok(DistFormat::Sdist),
            "all" => Ok(DistFormat::All),
            _ => Err(ConfigError::UnsupportedFormat(s.to_string())),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn formats_from_string_or_list<'de, D>(deserializer: D) -> Result<Vec<DistFormat>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) if s.trim().is_empty() => Vec::new(),
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    };

    raw.iter()
        .map(|s| s.parse::<DistFormat>().map_err(serde::de::Error::custom))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(content: &str) -> Result<PackageInfoSettings, ConfigError> {
        let table: toml::Table = toml::from_str(content)?;
        PackageInfoSettings::from_value(Some(&toml::Value::Table(table)))
    }

    #[test]
    fn test_defaults_when_section_missing() {
        let settings = PackageInfoSettings::from_value(None);
        assert!(settings.is_ok_and(|s| {
            s.properties.len() == DEFAULT_PROPERTIES.len()
                && s.generators.len() == 2
                && s.formatter == DEFAULT_FORMATTER
                && s.line_separator == "\n"
                && s.patch_formats().is_empty()
        }));
    }

    #[test]
    fn test_mixed_property_entries_keep_order() {
        let content = r#"
properties = [
    "project-name",
    { property-generator = "git", property-name = "commit-id", variable-name = "sha", metadata = { doc = "commit" } },
    "git-branch-name",
]
"#;
        let Ok(settings) = decode(content) else {
            panic!("settings should decode");
        };
        assert_eq!(settings.properties.len(), 3);
        assert_eq!(
            settings.properties[0],
            PropertyEntry::Compact("project-name".to_string())
        );
        let PropertyEntry::Expanded(entry) = &settings.properties[1] else {
            panic!("expected expanded entry");
        };
        assert_eq!(entry.property_generator.as_deref(), Some("git"));
        assert_eq!(entry.variable_name.as_deref(), Some("sha"));
        assert_eq!(
            entry.metadata.get("doc").and_then(|v| v.as_str()),
            Some("commit")
        );
    }

    #[test]
    fn test_patch_formats_string_or_list() {
        let single = decode(r#"patch-build-formats = "wheel""#);
        assert!(single.is_ok_and(|s| s.patch_build_formats == vec![DistFormat::Wheel]));

        let empty = decode(r#"patch-build-formats = """#);
        assert!(empty.is_ok_and(|s| s.patch_build_formats.is_empty()));

        let many = decode(r#"patch-build-formats = ["sdist", "wheel"]"#);
        assert!(many.is_ok_and(|s| s.should_patch(DistFormat::Sdist)
            && s.should_patch(DistFormat::Wheel)));
    }

    #[test]
    fn test_patch_formats_rejects_unknown() {
        let result = decode(r#"patch-build-formats = ["egg"]"#);
        assert!(matches!(result, Err(ConfigError::Settings(_))));
    }

    #[test]
    fn test_patch_wheels_flag() {
        let result = decode("patch-wheels = true");
        assert!(result.is_ok_and(|s| s.should_patch(DistFormat::Wheel)
            && !s.should_patch(DistFormat::Sdist)));
    }

    #[test]
    fn test_all_patches_everything() {
        let result = decode(r#"patch-build-formats = "all""#);
        assert!(result.is_ok_and(|s| s.should_patch(DistFormat::Sdist)
            && s.should_patch(DistFormat::Wheel)));
    }

    #[test]
    fn test_dist_format_parse() {
        assert!(matches!("Wheel".parse::<DistFormat>(), Ok(DistFormat::Wheel)));
        assert!(matches!(
            "exe".parse::<DistFormat>(),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        assert_eq!(
            DistFormat::All.expand(),
            vec![DistFormat::Sdist, DistFormat::Wheel]
        );
    }
}
