use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating, parsing, or resolving plugin configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse pyproject.toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No pyproject.toml found in {0} or any parent directory")]
    PyProjectNotFound(PathBuf),

    #[error("Missing expected project field '{0}' in pyproject.toml")]
    MissingProjectField(String),

    #[error("Invalid [tool.package-info] configuration: {0}")]
    Settings(toml::de::Error),

    #[error("Unknown property generator '{0}'")]
    UnknownGenerator(String),

    #[error("Unknown generator backend '{0}'")]
    UnknownGeneratorBackend(String),

    #[error("Unknown content formatter '{0}'")]
    UnknownFormatter(String),

    #[error("Unsupported value in properties '{0}', expected '<generator>-<property>'")]
    InvalidPropertyRequest(String),

    #[error("Missing expected '{field}' value in properties entry #{index}")]
    MissingPropertyField { field: &'static str, index: usize },

    #[error("Variable name '{0}' is produced by more than one property")]
    DuplicateVariableName(String),

    #[error("Variable name '{0}' is not a valid Python identifier")]
    InvalidVariableName(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
