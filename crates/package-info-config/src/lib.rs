//! Configuration for package-info
//!
//! Locates and parses `pyproject.toml`, exposes the project metadata fields and
//! decodes the `[tool.package-info]` table into typed settings.

pub mod errors;
pub mod pyproject;
pub mod settings;

pub use errors::ConfigError;
pub use pyproject::{
    distribution_name, find_pyproject_toml_path, module_name, normalized_version, ProjectMetadata,
    PyProject,
};
pub use settings::{
    DistFormat, ExpandedPropertyEntry, PackageInfoSettings, PropertyEntry, DEFAULT_PROPERTIES,
};
