//! Python literal and type-hint rendering
//!
//! [`to_source_literal`] and [`type_literal`] are pure and total over the
//! value space a property can hold; the template renderer calls them once per
//! property.

use chrono::{DateTime, FixedOffset, SecondsFormat, Timelike};
use std::collections::BTreeSet;
use std::fmt::Write as _;

/// Module that provides `datetime.datetime`
pub const DATETIME_MODULE: &str = "datetime";

const BUILTINS_MODULE: &str = "builtins";

/// Semantic type of a generated property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PyType {
    None,
    Bool,
    Int,
    Float,
    Str,
    DateTime,
    List(Box<PyType>),
    Dict(Box<PyType>, Box<PyType>),
    Union(Vec<PyType>),
    /// Any other type, named by its defining module
    Named {
        module: String,
        name: String,
        args: Vec<PyType>,
    },
}

impl PyType {
    /// `T | None`
    pub fn optional(inner: PyType) -> Self {
        PyType::Union(vec![inner, PyType::None])
    }

    pub fn list_of(inner: PyType) -> Self {
        PyType::List(Box::new(inner))
    }

    /// Direct type arguments (generic parameters and union members)
    pub fn args(&self) -> Vec<&PyType> {
        match self {
            PyType::List(inner) => vec![inner.as_ref()],
            PyType::Dict(k, v) => vec![k.as_ref(), v.as_ref()],
            PyType::Union(members) => members.iter().collect(),
            PyType::Named { args, .. } => args.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// This type followed by every nested type argument, depth first
    pub fn walk(&self) -> Vec<&PyType> {
        let mut out = vec![self];
        for arg in self.args() {
            out.extend(arg.walk());
        }
        out
    }

    /// Module that must be imported for this type itself, ignoring its arguments
    pub fn defining_module(&self) -> Option<&str> {
        match self {
            PyType::DateTime => Some(DATETIME_MODULE),
            PyType::Named { module, .. } if module != BUILTINS_MODULE => Some(module),
            _ => None,
        }
    }
}

/// Modules needed so every type (and nested type argument) resolves
pub fn required_imports<'a>(types: impl IntoIterator<Item = &'a PyType>) -> BTreeSet<String> {
    types
        .into_iter()
        .flat_map(PyType::walk)
        .filter_map(PyType::defining_module)
        .map(str::to_string)
        .collect()
}

/// Value of a generated property
#[derive(Debug, Clone, PartialEq)]
pub enum PyValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(DateTime<FixedOffset>),
    List(Vec<PyValue>),
    /// A type object, e.g. the value `str | None`
    Type(PyType),
}

impl PyValue {
    pub fn is_none(&self) -> bool {
        matches!(self, PyValue::None)
    }

    /// JSON view exposed to templates; timestamps become ISO strings, types their annotation text
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            PyValue::None => Value::Null,
            PyValue::Bool(b) => Value::Bool(*b),
            PyValue::Int(i) => Value::from(*i),
            PyValue::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            PyValue::Str(s) => Value::String(s.clone()),
            PyValue::DateTime(dt) => Value::String(iso_timestamp(dt)),
            PyValue::List(items) => Value::Array(items.iter().map(PyValue::to_json).collect()),
            PyValue::Type(ty) => Value::String(type_literal(ty)),
        }
    }
}

impl From<bool> for PyValue {
    fn from(value: bool) -> Self {
        PyValue::Bool(value)
    }
}

impl From<i64> for PyValue {
    fn from(value: i64) -> Self {
        PyValue::Int(value)
    }
}

impl From<f64> for PyValue {
    fn from(value: f64) -> Self {
        PyValue::Float(value)
    }
}

impl From<&str> for PyValue {
    fn from(value: &str) -> Self {
        PyValue::Str(value.to_string())
    }
}

impl From<String> for PyValue {
    fn from(value: String) -> Self {
        PyValue::Str(value)
    }
}

impl From<DateTime<FixedOffset>> for PyValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        PyValue::DateTime(value)
    }
}

impl<T: Into<PyValue>> From<Vec<T>> for PyValue {
    fn from(values: Vec<T>) -> Self {
        PyValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PyValue>> From<Option<T>> for PyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PyValue::None, Into::into)
    }
}

/// Render a value as Python source
pub fn to_source_literal(value: &PyValue) -> String {
    match value {
        PyValue::None => "None".to_string(),
        PyValue::Bool(true) => "True".to_string(),
        PyValue::Bool(false) => "False".to_string(),
        PyValue::Int(i) => i.to_string(),
        PyValue::Float(f) => float_literal(*f),
        PyValue::Str(s) => string_literal(s),
        PyValue::DateTime(dt) => format!(
            "datetime.datetime.fromisoformat({})",
            string_literal(&iso_timestamp(dt))
        ),
        PyValue::List(items) => {
            let inner: Vec<String> = items.iter().map(to_source_literal).collect();
            format!("[{}]", inner.join(", "))
        }
        PyValue::Type(ty) => type_literal(ty),
    }
}

/// Render a type annotation
pub fn type_literal(ty: &PyType) -> String {
    match ty {
        PyType::None => "None".to_string(),
        PyType::Bool => "bool".to_string(),
        PyType::Int => "int".to_string(),
        PyType::Float => "float".to_string(),
        PyType::Str => "str".to_string(),
        PyType::DateTime => format!("{}.datetime", DATETIME_MODULE),
        PyType::List(inner) => format!("list[{}]", type_literal(inner)),
        PyType::Dict(k, v) => format!("dict[{}, {}]", type_literal(k), type_literal(v)),
        PyType::Union(members) => members
            .iter()
            .map(type_literal)
            .collect::<Vec<_>>()
            .join(" | "),
        PyType::Named { module, name, args } => {
            let mut out = if module == BUILTINS_MODULE {
                name.clone()
            } else {
                format!("{}.{}", module, name)
            };
            if !args.is_empty() {
                let rendered: Vec<String> = args.iter().map(type_literal).collect();
                let _ = write!(out, "[{}]", rendered.join(", "));
            }
            out
        }
    }
}

/// Render `value` for a line that already holds `prefix_width` characters.
///
/// Lists break one element per line and long strings become a parenthesised
/// implicit concatenation when the single-line form would exceed `line_length`.
/// Continuation lines are indented by `indent + 4`, the closing bracket by `indent`.
pub fn wrapped_literal(value: &PyValue, prefix_width: usize, line_length: usize, indent: usize) -> String {
    let single = to_source_literal(value);
    if prefix_width + single.chars().count() <= line_length {
        return single;
    }

    let inner_pad = " ".repeat(indent + 4);
    let outer_pad = " ".repeat(indent);

    match value {
        PyValue::List(items) if !items.is_empty() => {
            let mut out = String::from("[\n");
            for item in items {
                let _ = writeln!(out, "{}{},", inner_pad, to_source_literal(item));
            }
            out.push_str(&outer_pad);
            out.push(']');
            out
        }
        PyValue::Str(s) => {
            let width = line_length.saturating_sub(indent + 4 + 2).max(16);
            let chars: Vec<char> = s.chars().collect();
            if chars.len() <= width {
                return single;
            }
            let mut out = String::from("(\n");
            for chunk in chars.chunks(width) {
                let chunk: String = chunk.iter().collect();
                let _ = writeln!(out, "{}{}", inner_pad, string_literal(&chunk));
            }
            out.push_str(&outer_pad);
            out.push(')');
            out
        }
        _ => single,
    }
}

/// Double-quoted Python string literal
pub fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn float_literal(f: f64) -> String {
    if f.is_nan() {
        "float(\"nan\")".to_string()
    } else if f.is_infinite() {
        if f > 0.0 {
            "float(\"inf\")".to_string()
        } else {
            "float(\"-inf\")".to_string()
        }
    } else {
        // Debug always keeps a decimal point or exponent, e.g. `1.0`, `1e20`
        format!("{:?}", f)
    }
}

/// ISO-8601 form accepted by `datetime.fromisoformat` (microsecond precision at most)
fn iso_timestamp(dt: &DateTime<FixedOffset>) -> String {
    if dt.nanosecond() == 0 {
        dt.to_rfc3339_opts(SecondsFormat::Secs, false)
    } else {
        dt.to_rfc3339_opts(SecondsFormat::Micros, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamp(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap_or_default()
    }

    #[test]
    fn test_scalar_literals() {
        assert_eq!(to_source_literal(&PyValue::None), "None");
        assert_eq!(to_source_literal(&true.into()), "True");
        assert_eq!(to_source_literal(&false.into()), "False");
        assert_eq!(to_source_literal(&42i64.into()), "42");
        assert_eq!(to_source_literal(&(-7i64).into()), "-7");
        assert_eq!(to_source_literal(&1.0f64.into()), "1.0");
        assert_eq!(to_source_literal(&0.25f64.into()), "0.25");
        assert_eq!(to_source_literal(&f64::INFINITY.into()), "float(\"inf\")");
        assert_eq!(to_source_literal(&"demo".into()), "\"demo\"");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(
            string_literal("say \"hi\"\\\n\tok"),
            r#""say \"hi\"\\\n\tok""#
        );
        assert_eq!(string_literal("bell\u{7}"), r#""bell\x07""#);
        assert_eq!(string_literal("Zoë"), "\"Zoë\"");
    }

    #[test]
    fn test_timestamp_literal_keeps_offset() {
        let value = PyValue::DateTime(timestamp("2023-06-09T01:23:45+02:00"));
        assert_eq!(
            to_source_literal(&value),
            r#"datetime.datetime.fromisoformat("2023-06-09T01:23:45+02:00")"#
        );

        let utc = PyValue::DateTime(timestamp("2023-06-09T01:23:45Z"));
        assert_eq!(
            to_source_literal(&utc),
            r#"datetime.datetime.fromisoformat("2023-06-09T01:23:45+00:00")"#
        );
    }

    #[test]
    fn test_timestamp_literal_does_not_truncate() {
        let value = PyValue::DateTime(timestamp("2023-06-09T01:23:45.678+00:00"));
        assert_eq!(
            to_source_literal(&value),
            r#"datetime.datetime.fromisoformat("2023-06-09T01:23:45.678000+00:00")"#
        );
    }

    #[test]
    fn test_list_literal() {
        let value: PyValue = vec!["a", "b"].into();
        assert_eq!(to_source_literal(&value), r#"["a", "b"]"#);
        assert_eq!(to_source_literal(&PyValue::List(Vec::new())), "[]");

        let nested = PyValue::List(vec![PyValue::None, 3i64.into(), vec![true].into()]);
        assert_eq!(to_source_literal(&nested), "[None, 3, [True]]");
    }

    #[test]
    fn test_option_conversion() {
        let missing: Option<String> = None;
        assert!(PyValue::from(missing).is_none());
        assert_eq!(PyValue::from(Some("x")), PyValue::Str("x".to_string()));
    }

    #[test]
    fn test_type_literals() {
        assert_eq!(type_literal(&PyType::Str), "str");
        assert_eq!(type_literal(&PyType::optional(PyType::Str)), "str | None");
        assert_eq!(type_literal(&PyType::list_of(PyType::Str)), "list[str]");
        assert_eq!(
            type_literal(&PyType::optional(PyType::DateTime)),
            "datetime.datetime | None"
        );
        assert_eq!(
            type_literal(&PyType::Dict(
                Box::new(PyType::Str),
                Box::new(PyType::list_of(PyType::optional(PyType::Int)))
            )),
            "dict[str, list[int | None]]"
        );

        let named = PyType::Named {
            module: "pathlib".to_string(),
            name: "Path".to_string(),
            args: Vec::new(),
        };
        assert_eq!(type_literal(&named), "pathlib.Path");

        let generic = PyType::Named {
            module: "collections".to_string(),
            name: "OrderedDict".to_string(),
            args: vec![PyType::Str, PyType::Int],
        };
        assert_eq!(type_literal(&generic), "collections.OrderedDict[str, int]");
    }

    #[test]
    fn test_type_value_renders_as_type() {
        let value = PyValue::Type(PyType::optional(PyType::Bool));
        assert_eq!(to_source_literal(&value), "bool | None");
    }

    #[test]
    fn test_required_imports_recurse_into_arguments() {
        let types = [
            PyType::Str,
            PyType::optional(PyType::DateTime),
            PyType::list_of(PyType::Named {
                module: "pathlib".to_string(),
                name: "Path".to_string(),
                args: Vec::new(),
            }),
            PyType::Named {
                module: "builtins".to_string(),
                name: "bytes".to_string(),
                args: Vec::new(),
            },
        ];
        let imports = required_imports(types.iter());
        let imports: Vec<&str> = imports.iter().map(String::as_str).collect();
        assert_eq!(imports, vec!["datetime", "pathlib"]);
    }

    #[test]
    fn test_wrapped_literal_short_values_stay_inline() {
        let value: PyValue = vec!["a", "b"].into();
        assert_eq!(wrapped_literal(&value, 20, 79, 4), r#"["a", "b"]"#);
    }

    #[test]
    fn test_wrapped_literal_breaks_long_lists() {
        let value: PyValue = vec![
            "Programming Language :: Python :: 3",
            "License :: OSI Approved :: MIT License",
        ]
        .into();
        let wrapped = wrapped_literal(&value, 40, 79, 4);
        assert_eq!(
            wrapped,
            "[\n        \"Programming Language :: Python :: 3\",\n        \"License :: OSI Approved :: MIT License\",\n    ]"
        );
    }

    #[test]
    fn test_wrapped_literal_splits_long_strings() {
        let text = "x".repeat(100);
        let wrapped = wrapped_literal(&PyValue::Str(text.clone()), 30, 40, 4);
        assert!(wrapped.starts_with("(\n"));
        assert!(wrapped.ends_with("\n    )"));

        // implicit concatenation of the chunks reproduces the original text
        let rejoined: String = wrapped
            .lines()
            .filter(|l| l.trim_start().starts_with('"'))
            .map(|l| l.trim().trim_matches('"'))
            .collect();
        assert_eq!(rejoined, text);
        assert!(wrapped.lines().all(|l| l.chars().count() <= 40));
    }
}
