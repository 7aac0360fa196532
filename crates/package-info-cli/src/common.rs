//! Common types and utilities shared across modules

use clap::Parser;
use std::path::{Path, PathBuf};

/// Global CLI options available to all commands
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    #[arg(short, long, global = true, help = "Decrease verbosity")]
    pub quiet: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity (-v for debug, -vv for trace)")]
    pub verbose: u8,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Directory to search for pyproject.toml (defaults to the current directory)"
    )]
    pub project: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH", help = "Also write log messages to this file")]
    pub log_file: Option<PathBuf>,
}

impl GlobalOpts {
    /// Get the effective verbosity level
    /// - 0: quiet/warn only
    /// - 1: debug (-v)
    /// - 2: trace (-vv)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Directory the pyproject.toml search starts from
    pub fn project_dir(&self) -> &Path {
        self.project.as_deref().unwrap_or_else(|| Path::new("."))
    }
}
