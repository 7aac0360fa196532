//! `git` generator: commit, branch and working-tree state
//!
//! The repository is read once during `init`. A project outside any git
//! repository is not an error; every property then resolves to `None`.

use super::{unknown_property, PluginContext, PropertyGenerator};
use crate::errors::GeneratorError;
use chrono::{DateTime, FixedOffset};
use git2::{ErrorCode, Repository, Status, StatusOptions};
use package_info_codegen::{GeneratedProperty, PropertyRequest, PyType};
use std::path::Path;
use tracing::debug;

pub const SHORT_NAME: &str = "git";

pub const PROPERTIES: &[&str] = &[
    "commit-id",
    "commit-author-name",
    "commit-author-email",
    "commit-timestamp",
    "branch-name",
    "branch-path",
    "is-dirty",
    "is-dirty-excluding-untracked",
    "has-staged-changes",
    "has-unstaged-changes",
    "has-untracked-changes",
];

const BRANCH_PREFIX: &str = "refs/heads/";

const STAGED: Status = Status::INDEX_NEW
    .union(Status::INDEX_MODIFIED)
    .union(Status::INDEX_DELETED)
    .union(Status::INDEX_RENAMED)
    .union(Status::INDEX_TYPECHANGE);

const UNSTAGED: Status = Status::WT_MODIFIED
    .union(Status::WT_DELETED)
    .union(Status::WT_TYPECHANGE)
    .union(Status::WT_RENAMED);

/// Repository state captured at initialisation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GitSnapshot {
    pub commit_id: Option<String>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub commit_timestamp: Option<DateTime<FixedOffset>>,
    pub branch_name: Option<String>,
    pub branch_path: Option<String>,
    pub has_staged_changes: Option<bool>,
    pub has_unstaged_changes: Option<bool>,
    pub has_untracked_changes: Option<bool>,
}

impl GitSnapshot {
    /// Read the repository at `root`, or the nearest enclosing one when `search_parents` is set
    pub fn read(root: &Path, search_parents: bool) -> Result<Self, GeneratorError> {
        let opened = if search_parents {
            Repository::discover(root)
        } else {
            Repository::open(root)
        };

        let repo = match opened {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => {
                debug!("No git repository at {:?}", root);
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut snapshot = Self::default();
        snapshot.read_head(&repo)?;
        if !repo.is_bare() {
            snapshot.read_status(&repo)?;
        }
        Ok(snapshot)
    }

    fn read_head(&mut self, repo: &Repository) -> Result<(), GeneratorError> {
        // The symbolic HEAD names the branch even before its first commit
        let head_ref = repo.find_reference("HEAD")?;
        if let Some(target) = head_ref.symbolic_target() {
            self.branch_path = Some(target.to_string());
            self.branch_name = Some(
                target
                    .strip_prefix(BRANCH_PREFIX)
                    .unwrap_or(target)
                    .to_string(),
            );
        }

        let commit = match repo.head() {
            Ok(head) => head.peel_to_commit()?,
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                debug!("Repository has no commits yet");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let author = commit.author();
        self.commit_id = Some(commit.id().to_string());
        self.author_name = author.name().map(str::to_string);
        self.author_email = author.email().map(str::to_string);

        let time = commit.time();
        self.commit_timestamp = FixedOffset::east_opt(time.offset_minutes() * 60)
            .zip(DateTime::from_timestamp(time.seconds(), 0))
            .map(|(offset, utc)| utc.with_timezone(&offset));
        Ok(())
    }

    fn read_status(&mut self, repo: &Repository) -> Result<(), GeneratorError> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .exclude_submodules(true);

        let mut staged = false;
        let mut unstaged = false;
        let mut untracked = false;
        for entry in repo.statuses(Some(&mut options))?.iter() {
            let status = entry.status();
            staged |= status.intersects(STAGED);
            unstaged |= status.intersects(UNSTAGED);
            untracked |= status.contains(Status::WT_NEW);
        }

        self.has_staged_changes = Some(staged);
        self.has_unstaged_changes = Some(unstaged);
        self.has_untracked_changes = Some(untracked);
        Ok(())
    }

    pub fn is_dirty(&self) -> Option<bool> {
        Some(self.is_dirty_excluding_untracked()? || self.has_untracked_changes?)
    }

    pub fn is_dirty_excluding_untracked(&self) -> Option<bool> {
        Some(self.has_staged_changes? || self.has_unstaged_changes?)
    }
}

#[derive(Debug, Default)]
pub struct GitPropertyGenerator {
    snapshot: GitSnapshot,
}

impl GitPropertyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &GitSnapshot {
        &self.snapshot
    }
}

impl PropertyGenerator for GitPropertyGenerator {
    fn short_name(&self) -> &str {
        SHORT_NAME
    }

    fn init(&mut self, context: &PluginContext) -> Result<(), GeneratorError> {
        self.snapshot = GitSnapshot::read(
            context.project_root(),
            context.settings.git_search_parent_directories,
        )?;
        Ok(())
    }

    fn supported_properties(&self) -> &[&'static str] {
        PROPERTIES
    }

    fn generate_property(
        &self,
        request: &PropertyRequest,
    ) -> Result<GeneratedProperty, GeneratorError> {
        let s = &self.snapshot;
        let text = |value: &Option<String>| {
            GeneratedProperty::new(request, value.clone(), PyType::optional(PyType::Str))
        };
        let flag = |value: Option<bool>| {
            GeneratedProperty::new(request, value, PyType::optional(PyType::Bool))
        };

        let property = match request.property_name.as_str() {
            "commit-id" => text(&s.commit_id),
            "commit-author-name" => text(&s.author_name),
            "commit-author-email" => text(&s.author_email),
            "commit-timestamp" => GeneratedProperty::new(
                request,
                s.commit_timestamp,
                PyType::optional(PyType::DateTime),
            ),
            "branch-name" => text(&s.branch_name),
            "branch-path" => text(&s.branch_path),
            "is-dirty" => flag(s.is_dirty()),
            "is-dirty-excluding-untracked" => flag(s.is_dirty_excluding_untracked()),
            "has-staged-changes" => flag(s.has_staged_changes),
            "has-unstaged-changes" => flag(s.has_unstaged_changes),
            "has-untracked-changes" => flag(s.has_untracked_changes),
            _ => return Err(unknown_property(SHORT_NAME, request)),
        };
        Ok(property)
    }
}
