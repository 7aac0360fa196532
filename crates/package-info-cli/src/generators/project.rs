//! `project` generator: fields from pyproject.toml

use super::{unknown_property, PluginContext, PropertyGenerator};
use crate::errors::GeneratorError;
use package_info_codegen::{GeneratedProperty, PropertyRequest, PyType};
use package_info_config::ProjectMetadata;

pub const SHORT_NAME: &str = "project";

pub const PROPERTIES: &[&str] = &[
    "name",
    "description",
    "version",
    "authors",
    "license",
    "classifiers",
    "documentation",
    "repository",
    "homepage",
    "maintainers",
    "keywords",
];

#[derive(Debug, Default)]
pub struct ProjectPropertyGenerator {
    metadata: ProjectMetadata,
}

impl ProjectPropertyGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PropertyGenerator for ProjectPropertyGenerator {
    fn short_name(&self) -> &str {
        SHORT_NAME
    }

    fn init(&mut self, context: &PluginContext) -> Result<(), GeneratorError> {
        self.metadata = context.metadata.clone();
        Ok(())
    }

    fn supported_properties(&self) -> &[&'static str] {
        PROPERTIES
    }

    fn generate_property(
        &self,
        request: &PropertyRequest,
    ) -> Result<GeneratedProperty, GeneratorError> {
        let meta = &self.metadata;
        let optional_str = |value: &Option<String>| {
            GeneratedProperty::new(request, value.clone(), PyType::optional(PyType::Str))
        };
        let str_list = |value: &Vec<String>| {
            GeneratedProperty::new(request, value.clone(), PyType::list_of(PyType::Str))
        };

        let property = match request.property_name.as_str() {
            "name" => GeneratedProperty::new(request, meta.require_name()?, PyType::Str),
            "version" => GeneratedProperty::new(request, meta.require_version()?, PyType::Str),
            "description" => optional_str(&meta.description),
            "license" => optional_str(&meta.license),
            "documentation" => optional_str(&meta.documentation),
            "repository" => optional_str(&meta.repository),
            "homepage" => optional_str(&meta.homepage),
            "authors" => str_list(&meta.authors),
            "maintainers" => str_list(&meta.maintainers),
            "classifiers" => str_list(&meta.classifiers),
            "keywords" => str_list(&meta.keywords),
            _ => return Err(unknown_property(SHORT_NAME, request)),
        };
        Ok(property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use package_info_codegen::{to_source_literal, PyValue};
    use package_info_config::{PackageInfoSettings, PyProject};
    use std::path::Path;

    const PYPROJECT: &str = r#"
[tool.poetry]
name = "demo"
version = "1.2.3"
description = "Demo project"
authors = ["Ada Lovelace <ada@example.com>"]
"#;

    fn generator(content: &str) -> ProjectPropertyGenerator {
        let Ok(pyproject) = PyProject::parse(Path::new("pyproject.toml"), content) else {
            panic!("valid pyproject");
        };
        let context = PluginContext::new(pyproject, PackageInfoSettings::default());
        let mut generator = ProjectPropertyGenerator::new();
        assert!(generator.init(&context).is_ok());
        generator
    }

    fn generate(generator: &ProjectPropertyGenerator, name: &str) -> Result<GeneratedProperty, GeneratorError> {
        let variable = format!("project_{}", name);
        generator.generate_property(&PropertyRequest::new(SHORT_NAME, name, variable))
    }

    #[test]
    fn test_required_fields_are_plain_str() {
        let generator = generator(PYPROJECT);
        let Ok(name) = generate(&generator, "name") else {
            panic!("name resolves");
        };
        assert_eq!(name.value, PyValue::Str("demo".to_string()));
        assert_eq!(name.value_type, PyType::Str);

        let Ok(version) = generate(&generator, "version") else {
            panic!("version resolves");
        };
        assert_eq!(to_source_literal(&version.value), "\"1.2.3\"");
    }

    #[test]
    fn test_optional_and_list_fields() {
        let generator = generator(PYPROJECT);
        let Ok(homepage) = generate(&generator, "homepage") else {
            panic!("homepage resolves");
        };
        assert!(homepage.value.is_none());
        assert_eq!(homepage.value_type, PyType::optional(PyType::Str));

        let Ok(authors) = generate(&generator, "authors") else {
            panic!("authors resolves");
        };
        assert_eq!(
            to_source_literal(&authors.value),
            r#"["Ada Lovelace <ada@example.com>"]"#
        );

        let Ok(keywords) = generate(&generator, "keywords") else {
            panic!("keywords resolves");
        };
        assert_eq!(to_source_literal(&keywords.value), "[]");
    }

    #[test]
    fn test_every_listed_property_resolves() {
        let generator = generator(PYPROJECT);
        for name in PROPERTIES {
            assert!(generate(&generator, name).is_ok(), "{} should resolve", name);
        }
    }

    #[test]
    fn test_unknown_property_names_the_property() {
        let generator = generator(PYPROJECT);
        let result = generate(&generator, "colour");
        assert!(matches!(
            result,
            Err(GeneratorError::UnknownProperty { ref property, .. }) if property == "colour"
        ));
    }

    #[test]
    fn test_missing_version_is_an_error() {
        let generator = generator("[project]\nname = \"demo\"\n");
        assert!(matches!(
            generate(&generator, "version"),
            Err(GeneratorError::Config(_))
        ));
    }
}
