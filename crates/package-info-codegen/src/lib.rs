//! Code generation for package-info
//!
//! Turns generated properties into Python source: literal and type-hint
//! rendering, the Tera-based module template, and the content formatters
//! applied to the rendered text.

pub mod errors;
pub mod formatter;
pub mod property;
pub mod template;
pub mod value;

pub use errors::{FormatError, TemplateError};
pub use formatter::{
    CommandFormatter, ContentFormatter, ExternalTool, FormatterOptions, NormalizeFormatter,
    PassthroughFormatter,
};
pub use property::{GeneratedProperty, PropertyRequest};
pub use template::{TemplateRenderer, DEFAULT_TEMPLATE};
pub use value::{to_source_literal, type_literal, PyType, PyValue};

/// Wrapping width used when nothing else is configured
pub const DEFAULT_LINE_LENGTH: usize = 79;
