//! Error types for the package-info CLI and plugin
//!
//! Library crates keep their own error enums; this module defines the
//! generator errors and the top-level [`PackageInfoError`] that wraps them.

use package_info_archive::ArchiveError;
use package_info_codegen::{FormatError, TemplateError};
use package_info_config::ConfigError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by property generators
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Unsupported {generator} property '{property}'")]
    UnknownProperty { generator: String, property: String },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Top-level error for every plugin operation
#[derive(Error, Debug)]
pub enum PackageInfoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
