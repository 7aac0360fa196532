//! Plugin orchestration
//!
//! [`PackageInfoPlugin`] drives the manual generate action and the post-build
//! hook. The configuration is resolved lazily on first use and then reused
//! for the lifetime of the plugin instance.

use crate::errors::PackageInfoError;
use crate::logger;
use crate::registry::BackendRegistry;
use crate::resolver::{resolve_configuration, PluginConfiguration};
use chrono::{Local, NaiveDateTime};
use once_cell::unsync::OnceCell;
use package_info_archive::{append_or_replace, PatchOutcome};
use package_info_config::{
    distribution_name, normalized_version, ConfigError, DistFormat, PyProject,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub const DEFAULT_DIST_DIR: &str = "dist";

/// Command the host was running when it terminated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    Build {
        /// Value of `build --format`; `None` means all formats
        format: Option<String>,
        /// Directory holding built artifacts, relative to the project root
        dist_dir: Option<PathBuf>,
    },
    Other(String),
}

impl HostCommand {
    pub fn from_parts(name: &str, format: Option<String>, dist_dir: Option<PathBuf>) -> Self {
        if name == "build" {
            HostCommand::Build { format, dist_dir }
        } else {
            HostCommand::Other(name.to_string())
        }
    }
}

/// Host event delivered after a command finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminateEvent {
    pub command: HostCommand,
}

/// Result of writing (or previewing) the generated module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub content: String,
    pub written: bool,
}

/// One archive touched by the build hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedArtifact {
    pub format: DistFormat,
    pub archive: PathBuf,
    pub entry_name: String,
    pub outcome: PatchOutcome,
}

type Clock = Box<dyn Fn() -> NaiveDateTime>;

pub struct PackageInfoPlugin {
    pyproject: PyProject,
    registry: BackendRegistry,
    configuration: OnceCell<PluginConfiguration>,
    clock: Clock,
}

impl PackageInfoPlugin {
    pub fn new(pyproject: PyProject, registry: BackendRegistry) -> Self {
        Self {
            pyproject,
            registry,
            configuration: OnceCell::new(),
            clock: Box::new(|| Local::now().naive_local()),
        }
    }

    /// Locate pyproject.toml from `start` upward and use the built-in backends
    pub fn discover(start: &Path) -> Result<Self, PackageInfoError> {
        let pyproject = PyProject::discover(start)?;
        debug!("Using {:?}", pyproject.path);
        Ok(Self::new(pyproject, BackendRegistry::with_builtins()))
    }

    /// Replace the clock used for the header timestamp
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn pyproject(&self) -> &PyProject {
        &self.pyproject
    }

    pub fn configuration(&self) -> Result<&PluginConfiguration, PackageInfoError> {
        self.configuration
            .get_or_try_init(|| resolve_configuration(self.pyproject.clone(), &self.registry))
    }

    /// Render the module content without touching the filesystem
    pub fn render(&self) -> Result<String, PackageInfoError> {
        let config = self.configuration()?;
        config.render((self.clock)())
    }

    /// Write the module to its configured path, or only render it for a dry run
    pub fn generate_package_info(&self, dry_run: bool) -> Result<GeneratedFile, PackageInfoError> {
        let config = self.configuration()?;
        let content = self.render()?;
        let path = config.absolute_file_path.clone();

        if dry_run {
            return Ok(GeneratedFile {
                path,
                content,
                written: false,
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| PackageInfoError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, &content).map_err(|source| PackageInfoError::Write {
            path: path.clone(),
            source,
        })?;

        logger::success(&format!(
            "Generated file {}",
            logger::highlight(config.relative_file_path.display())
        ));

        Ok(GeneratedFile {
            path,
            content,
            written: true,
        })
    }

    /// Post-command hook: regenerate the module after a build and patch configured archives
    pub fn on_terminate(
        &self,
        event: &TerminateEvent,
    ) -> Result<Vec<PatchedArtifact>, PackageInfoError> {
        let (format, dist_dir) = match &event.command {
            HostCommand::Build { format, dist_dir } => (format.as_deref(), dist_dir.as_deref()),
            HostCommand::Other(name) => {
                debug!("Ignoring terminate event for '{}'", name);
                return Ok(Vec::new());
            }
        };

        let built_formats = build_formats(format)?;
        self.generate_package_info(false)?;

        let config = self.configuration()?;
        if config.patch_formats.is_empty() {
            return Ok(Vec::new());
        }

        let dist_dir = config
            .project_root
            .join(dist_dir.unwrap_or_else(|| Path::new(DEFAULT_DIST_DIR)));
        let version = config
            .project_version
            .as_deref()
            .map(normalized_version)
            .ok_or_else(|| ConfigError::MissingProjectField("version".to_string()))?;
        let dist_name = distribution_name(&config.project_name);

        let mut patched = Vec::new();
        for format in built_formats {
            if !config.should_patch(format) {
                continue;
            }

            let artifacts = find_artifacts(&dist_dir, format, &dist_name, &version);
            if artifacts.is_empty() {
                logger::warn(&format!(
                    "No {} artifact for {} {} found in {}, skipping",
                    format,
                    dist_name,
                    version,
                    dist_dir.display()
                ));
                continue;
            }

            let entry_name = match format {
                DistFormat::Sdist => config.sdist_entry_name(&dist_name, &version),
                _ => config.wheel_entry_name(),
            };

            for archive in artifacts {
                // each archive gets freshly rendered content
                let content = self.render()?;
                logger::info(&format!(
                    "Patching {} with {}",
                    logger::highlight(display_relative(&archive, &config.project_root)),
                    logger::highlight(&entry_name)
                ));
                let outcome = append_or_replace(&archive, &entry_name, content.as_bytes(), true)?;
                patched.push(PatchedArtifact {
                    format,
                    archive,
                    entry_name: entry_name.clone(),
                    outcome,
                });
            }
        }

        Ok(patched)
    }
}

/// Formats produced by `build --format`; absent means every format
pub fn build_formats(format: Option<&str>) -> Result<Vec<DistFormat>, ConfigError> {
    match format {
        None => Ok(DistFormat::All.expand()),
        Some(raw) => Ok(raw.parse::<DistFormat>()?.expand()),
    }
}

/// Artifacts for `format` in `dist_dir`, sorted by file name
pub fn find_artifacts(
    dist_dir: &Path,
    format: DistFormat,
    dist_name: &str,
    version: &str,
) -> Vec<PathBuf> {
    let wheel_prefix = format!("{}-{}-", dist_name, version);
    let sdist_name = format!("{}-{}.tar.gz", dist_name, version);

    let mut found: Vec<PathBuf> = WalkDir::new(dist_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            match format {
                DistFormat::Wheel => name.starts_with(&wheel_prefix) && name.ends_with(".whl"),
                DistFormat::Sdist => name == sdist_name.as_str(),
                DistFormat::All => false,
            }
        })
        .map(|entry| entry.into_path())
        .collect();
    found.sort();
    found
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
