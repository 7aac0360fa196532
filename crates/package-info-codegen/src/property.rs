use crate::value::{PyType, PyValue};
use serde_json::{Map, Value};

/// One property the user asked for, after configuration resolution
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRequest {
    /// Configured generator key
    pub generator: String,
    pub property_name: String,
    /// Identifier emitted in the generated file
    pub variable_name: String,
    /// Free-form data passed through to the template
    pub metadata: Map<String, Value>,
}

impl PropertyRequest {
    pub fn new(
        generator: impl Into<String>,
        property_name: impl Into<String>,
        variable_name: impl Into<String>,
    ) -> Self {
        Self {
            generator: generator.into(),
            property_name: property_name.into(),
            variable_name: variable_name.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A resolved property value and its semantic type
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedProperty {
    pub request: PropertyRequest,
    pub value: PyValue,
    pub value_type: PyType,
}

impl GeneratedProperty {
    pub fn new(request: &PropertyRequest, value: impl Into<PyValue>, value_type: PyType) -> Self {
        Self {
            request: request.clone(),
            value: value.into(),
            value_type,
        }
    }

    pub fn variable_name(&self) -> &str {
        &self.request.variable_name
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.request.metadata
    }
}
