//! Backend registry
//!
//! Generator and formatter locators from `[tool.package-info]` resolve to
//! factories registered here. The built-in backends are registered by
//! [`BackendRegistry::with_builtins`]; callers may add their own before the
//! configuration is resolved.

use crate::generators::git::GitPropertyGenerator;
use crate::generators::project::ProjectPropertyGenerator;
use crate::generators::PropertyGenerator;
use package_info_codegen::{
    CommandFormatter, ContentFormatter, NormalizeFormatter, PassthroughFormatter,
};
use package_info_config::ConfigError;
use std::collections::BTreeMap;

pub type GeneratorFactory = Box<dyn Fn() -> Box<dyn PropertyGenerator>>;
pub type FormatterFactory = Box<dyn Fn() -> Box<dyn ContentFormatter>>;

pub struct BackendRegistry {
    generators: BTreeMap<String, GeneratorFactory>,
    formatters: BTreeMap<String, FormatterFactory>,
}

impl BackendRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            generators: BTreeMap::new(),
            formatters: BTreeMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_generator("project", || Box::new(ProjectPropertyGenerator::new()));
        registry.register_generator("git", || Box::new(GitPropertyGenerator::new()));

        registry.register_formatter("none", || Box::new(PassthroughFormatter));
        registry.register_formatter("passthrough", || Box::new(PassthroughFormatter));
        registry.register_formatter("normalize", || Box::new(NormalizeFormatter));
        registry.register_formatter("black", || Box::new(CommandFormatter::black()));
        registry.register_formatter("ruff", || Box::new(CommandFormatter::ruff()));
        registry
    }

    /// Register (or replace) a generator backend under `locator`
    pub fn register_generator<F>(&mut self, locator: &str, factory: F)
    where
        F: Fn() -> Box<dyn PropertyGenerator> + 'static,
    {
        self.generators.insert(locator.to_string(), Box::new(factory));
    }

    pub fn register_formatter<F>(&mut self, locator: &str, factory: F)
    where
        F: Fn() -> Box<dyn ContentFormatter> + 'static,
    {
        self.formatters.insert(locator.to_string(), Box::new(factory));
    }

    /// Fresh, uninitialised generator for `locator`
    pub fn create_generator(&self, locator: &str) -> Result<Box<dyn PropertyGenerator>, ConfigError> {
        self.generators
            .get(locator)
            .map(|factory| factory())
            .ok_or_else(|| ConfigError::UnknownGeneratorBackend(locator.to_string()))
    }

    pub fn create_formatter(&self, locator: &str) -> Result<Box<dyn ContentFormatter>, ConfigError> {
        self.formatters
            .get(locator)
            .map(|factory| factory())
            .ok_or_else(|| ConfigError::UnknownFormatter(locator.to_string()))
    }

    pub fn generator_locators(&self) -> impl Iterator<Item = &str> {
        self.generators.keys().map(String::as_str)
    }

    pub fn formatter_locators(&self) -> impl Iterator<Item = &str> {
        self.formatters.keys().map(String::as_str)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
