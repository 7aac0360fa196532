//! Configuration resolution
//!
//! [`resolve_configuration`] turns a loaded pyproject.toml into an immutable
//! [`PluginConfiguration`]: ordered property requests, initialised generators,
//! the content formatter, the compiled template and the output paths.

use crate::errors::PackageInfoError;
use crate::generators::{PluginContext, PropertyGenerator};
use crate::registry::BackendRegistry;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use package_info_codegen::{
    ContentFormatter, FormatterOptions, GeneratedProperty, PropertyRequest, TemplateRenderer,
    DEFAULT_TEMPLATE,
};
use package_info_config::{module_name, ConfigError, DistFormat, PropertyEntry, PyProject};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PACKAGE_INFO_FILE: &str = "package_info.py";

const SRC_DIR: &str = "src";

static IDENTIFIER: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$"));

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Fully resolved plugin state; built once per plugin instance
pub struct PluginConfiguration {
    pub project_root: PathBuf,
    pub project_name: String,
    pub project_version: Option<String>,
    /// Output path relative to the project root
    pub relative_file_path: PathBuf,
    pub absolute_file_path: PathBuf,
    pub requests: Vec<PropertyRequest>,
    pub generators: BTreeMap<String, Box<dyn PropertyGenerator>>,
    pub formatter: Box<dyn ContentFormatter>,
    pub renderer: TemplateRenderer,
    pub line_separator: String,
    pub line_length: usize,
    pub patch_formats: Vec<DistFormat>,
}

impl PluginConfiguration {
    /// Resolve every request through its generator, in configured order
    pub fn generate_properties(&self) -> Result<Vec<GeneratedProperty>, PackageInfoError> {
        self.requests
            .iter()
            .map(|request| -> Result<GeneratedProperty, PackageInfoError> {
                let generator = self
                    .generators
                    .get(&request.generator)
                    .ok_or_else(|| ConfigError::UnknownGenerator(request.generator.clone()))?;
                Ok(generator.generate_property(request)?)
            })
            .collect()
    }

    /// Full file content: rendered, formatted, then joined with the line separator
    pub fn render(&self, generated_at: NaiveDateTime) -> Result<String, PackageInfoError> {
        let properties = self.generate_properties()?;
        let rendered = self.renderer.render(&properties, generated_at)?;
        let formatted = self.formatter.format_content(&rendered)?;
        Ok(apply_line_separator(&formatted, &self.line_separator))
    }

    /// Whether archives of `format` are patched after a build
    pub fn should_patch(&self, format: DistFormat) -> bool {
        self.patch_formats.contains(&DistFormat::All) || self.patch_formats.contains(&format)
    }

    /// Output path relative to the project root, `/`-separated; sdist members live under it
    pub fn entry_name(&self) -> String {
        member_name(&self.relative_file_path)
    }

    /// Wheel member name; wheels install packages from their root, so a `src/` prefix is dropped
    pub fn wheel_entry_name(&self) -> String {
        let relative = self
            .relative_file_path
            .strip_prefix(SRC_DIR)
            .unwrap_or(&self.relative_file_path);
        member_name(relative)
    }

    /// Sdist member name below the `<dist_name>-<version>/` top directory
    pub fn sdist_entry_name(&self, dist_name: &str, version: &str) -> String {
        format!("{}-{}/{}", dist_name, version, self.entry_name())
    }
}

fn member_name(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the plugin configuration for a project
pub fn resolve_configuration(
    pyproject: PyProject,
    registry: &BackendRegistry,
) -> Result<PluginConfiguration, PackageInfoError> {
    let settings = pyproject.settings()?;
    let context = PluginContext::new(pyproject, settings.clone());
    let project_root = context.project_root.clone();
    let project_name = context.metadata.require_name()?.to_string();

    let relative_file_path = settings
        .package_info_file_path
        .clone()
        .unwrap_or_else(|| default_file_path(&project_root, &project_name));
    let absolute_file_path = project_root.join(&relative_file_path);

    let mut generators = BTreeMap::new();
    for (key, locator) in &settings.generators {
        generators.insert(key.clone(), registry.create_generator(locator)?);
    }

    let requests = parse_property_requests(&settings.properties, &generators)?;

    for (key, generator) in &mut generators {
        debug!("Initialising generator '{}'", key);
        generator.init(&context)?;
    }

    let mut formatter = registry.create_formatter(&settings.formatter)?;
    formatter.init(&FormatterOptions {
        line_length: settings.line_length,
        project_root: project_root.clone(),
    })?;

    let template = settings.template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
    let renderer = TemplateRenderer::new(template, settings.line_length)?;

    debug!(
        "Resolved {} properties, output {:?}",
        requests.len(),
        relative_file_path
    );

    Ok(PluginConfiguration {
        project_root,
        project_name,
        project_version: context.metadata.version.clone(),
        relative_file_path,
        absolute_file_path,
        requests,
        generators,
        formatter,
        renderer,
        line_separator: settings.line_separator.clone(),
        line_length: settings.line_length,
        patch_formats: settings.patch_formats(),
    })
}

/// `<module>/package_info.py`, or `src/<module>/package_info.py` for a src layout
pub fn default_file_path(project_root: &Path, project_name: &str) -> PathBuf {
    let module = module_name(project_name);
    let flat = PathBuf::from(&module);
    let src = Path::new(SRC_DIR).join(&module);

    if !project_root.join(&flat).is_dir() && project_root.join(&src).is_dir() {
        src.join(PACKAGE_INFO_FILE)
    } else {
        flat.join(PACKAGE_INFO_FILE)
    }
}

/// Turn `properties` entries into ordered requests against the configured generators
pub fn parse_property_requests(
    entries: &[PropertyEntry],
    generators: &BTreeMap<String, Box<dyn PropertyGenerator>>,
) -> Result<Vec<PropertyRequest>, ConfigError> {
    let mut seen = HashSet::new();
    let mut requests = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let (generator_key, property_name, variable_name, metadata) = match entry {
            PropertyEntry::Compact(raw) => {
                let (generator, property) = raw
                    .split_once('-')
                    .filter(|(g, p)| !g.is_empty() && !p.is_empty())
                    .ok_or_else(|| ConfigError::InvalidPropertyRequest(raw.clone()))?;
                (generator.to_string(), property.to_string(), None, Map::new())
            }
            PropertyEntry::Expanded(expanded) => {
                let generator = expanded.property_generator.clone().ok_or(
                    ConfigError::MissingPropertyField {
                        field: "property-generator",
                        index,
                    },
                )?;
                let property =
                    expanded
                        .property_name
                        .clone()
                        .ok_or(ConfigError::MissingPropertyField {
                            field: "property-name",
                            index,
                        })?;
                let metadata = expanded
                    .metadata
                    .iter()
                    .map(|(k, v)| (k.clone(), toml_to_json(v)))
                    .collect();
                (generator, property, expanded.variable_name.clone(), metadata)
            }
        };

        let generator = generators
            .get(&generator_key)
            .ok_or_else(|| ConfigError::UnknownGenerator(generator_key.clone()))?;

        let variable_name = variable_name.unwrap_or_else(|| {
            format!(
                "{}_{}",
                generator.short_name(),
                property_name.replace('-', "_")
            )
        });

        if !is_identifier(&variable_name) {
            return Err(ConfigError::InvalidVariableName(variable_name));
        }
        if !seen.insert(variable_name.clone()) {
            return Err(ConfigError::DuplicateVariableName(variable_name));
        }

        requests.push(
            PropertyRequest::new(generator_key, property_name, variable_name)
                .with_metadata(metadata),
        );
    }

    Ok(requests)
}

/// Valid Python identifier that is not a keyword
pub fn is_identifier(name: &str) -> bool {
    let matches = match IDENTIFIER.as_ref() {
        Ok(re) => re.is_match(name),
        Err(_) => false,
    };
    matches && !PYTHON_KEYWORDS.contains(&name)
}

fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
    }
}

fn apply_line_separator(content: &str, separator: &str) -> String {
    if separator == "\n" {
        return content.to_string();
    }
    content.replace("\r\n", "\n").replace('\n', separator)
}
