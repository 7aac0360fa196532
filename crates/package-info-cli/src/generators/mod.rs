//! Property generator backends
//!
//! A generator resolves a named property to a typed Python value. Generators
//! are created empty by the [`crate::registry::BackendRegistry`] and then
//! initialised once with the [`PluginContext`].

pub mod git;
pub mod project;

use crate::errors::GeneratorError;
use package_info_codegen::{GeneratedProperty, PropertyRequest};
use package_info_config::{PackageInfoSettings, ProjectMetadata, PyProject};
use std::path::{Path, PathBuf};

/// Everything a backend may read while initialising
#[derive(Debug, Clone)]
pub struct PluginContext {
    pub project_root: PathBuf,
    pub pyproject: PyProject,
    pub metadata: ProjectMetadata,
    pub settings: PackageInfoSettings,
}

impl PluginContext {
    pub fn new(pyproject: PyProject, settings: PackageInfoSettings) -> Self {
        Self {
            project_root: pyproject.root_dir().to_path_buf(),
            metadata: pyproject.metadata(),
            pyproject,
            settings,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }
}

pub trait PropertyGenerator {
    /// Prefix used for default variable names, e.g. `git` -> `git_commit_id`
    fn short_name(&self) -> &str;

    fn init(&mut self, context: &PluginContext) -> Result<(), GeneratorError>;

    /// Property names this generator can resolve, in their documented order
    fn supported_properties(&self) -> &[&'static str];

    fn generate_property(
        &self,
        request: &PropertyRequest,
    ) -> Result<GeneratedProperty, GeneratorError>;
}

pub(crate) fn unknown_property(generator: &str, request: &PropertyRequest) -> GeneratorError {
    GeneratorError::UnknownProperty {
        generator: generator.to_string(),
        property: request.property_name.clone(),
    }
}
