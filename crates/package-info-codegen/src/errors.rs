use std::io;
use thiserror::Error;

/// Errors raised while compiling or rendering the output template
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template error: {0}")]
    Tera(#[from] tera::Error),
}

/// Errors raised by content formatters
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Formatter '{0}' was not found on PATH")]
    NotFound(String),

    #[error("Failed to run formatter '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Formatter '{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Formatter '{0}' produced non UTF-8 output")]
    InvalidOutput(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
