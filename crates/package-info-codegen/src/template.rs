//! Template rendering for the generated module
//!
//! Templates are Tera sources. Each property is exposed with its variable
//! name, type hint and a ready-made Python literal; the `python` filter turns
//! any other template value into Python source.

use crate::errors::TemplateError;
use crate::property::GeneratedProperty;
use crate::value::{required_imports, string_literal, to_source_literal, type_literal, wrapped_literal, PyValue};
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tera::{Context, Tera};
use tracing::debug;

/// Name the template is registered under inside Tera
pub const TEMPLATE_NAME: &str = "package_info.py";

/// Indentation of class attributes in the default template
const FIELD_INDENT: usize = 4;

pub const DEFAULT_TEMPLATE: &str = r#""""Auto-generated by package-info at {{ generated_at }}."""
{% for import in imports %}import {{ import }}
{% endfor %}

class PackageInfo:
{% for property in properties %}    {{ property.variable_name }}: {{ property.type_hint }} = {{ property.literal }}
{% endfor %}{% if not properties %}    pass
{% endif %}"#;

#[derive(Debug, Serialize)]
struct PropertyView<'a> {
    variable_name: &'a str,
    property_name: &'a str,
    generator: &'a str,
    type_hint: String,
    literal: String,
    value: Value,
    metadata: &'a Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct RenderContext<'a> {
    properties: Vec<PropertyView<'a>>,
    imports: Vec<String>,
    generated_at: String,
}

/// Compiled template plus the literal wrapping width
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    tera: Tera,
    line_length: usize,
}

impl TemplateRenderer {
    /// Compile a template source
    pub fn new(source: &str, line_length: usize) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        tera.register_filter("python", python);
        tera.add_raw_template(TEMPLATE_NAME, source)?;
        Ok(Self { tera, line_length })
    }

    pub fn with_default_template(line_length: usize) -> Result<Self, TemplateError> {
        Self::new(DEFAULT_TEMPLATE, line_length)
    }

    pub fn line_length(&self) -> usize {
        self.line_length
    }

    /// Render the properties in order; `generated_at` is stamped into the header
    pub fn render(
        &self,
        properties: &[GeneratedProperty],
        generated_at: NaiveDateTime,
    ) -> Result<String, TemplateError> {
        let imports = required_imports(properties.iter().map(|p| &p.value_type))
            .into_iter()
            .collect();

        let views = properties.iter().map(|p| self.view(p)).collect();

        let context = RenderContext {
            properties: views,
            imports,
            generated_at: generated_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        };

        debug!(
            "Rendering {} properties with {} imports",
            context.properties.len(),
            context.imports.len()
        );
        let context = Context::from_serialize(&context)?;
        Ok(self.tera.render(TEMPLATE_NAME, &context)?)
    }

    fn view<'a>(&self, property: &'a GeneratedProperty) -> PropertyView<'a> {
        let type_hint = type_literal(&property.value_type);
        // "    name: hint = "
        let prefix_width = FIELD_INDENT
            + property.variable_name().chars().count()
            + 2
            + type_hint.chars().count()
            + 3;
        let literal = wrapped_literal(&property.value, prefix_width, self.line_length, FIELD_INDENT);

        PropertyView {
            variable_name: property.variable_name(),
            property_name: &property.request.property_name,
            generator: &property.request.generator,
            type_hint,
            literal,
            value: property.value.to_json(),
            metadata: property.metadata(),
        }
    }
}

/// Tera filter: any template value as a Python literal
fn python(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(json_literal(value)))
}

fn json_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(b) => to_source_literal(&PyValue::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => to_source_literal(&PyValue::Float(n.as_f64().unwrap_or(f64::NAN))),
        },
        Value::String(s) => string_literal(s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(json_literal).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", string_literal(k), json_literal(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}
