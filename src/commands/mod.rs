//! Query operations
//!
//! Each operation is an inherent method on [`Repository`], reading HEAD once
//! and resolving everything else through the repository's query-scoped
//! object database.
//!
//! - `list_history`: the newest commits reachable from HEAD
//! - `changed_files`: files changed between HEAD and an ancestor
//! - `file_diff`: one file's line diff between HEAD and an ancestor
//! - `file_history`: every commit that touched a file, with its diff

pub mod changed_files;
pub mod file_diff;
pub mod file_history;
pub mod list_history;

use crate::areas::repository::Repository;
use crate::artifacts::log::rev_list::nth_ancestor;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{GitError, Result};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Commit metadata shown in history listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub oid: ObjectId,
    pub author: String,
    pub email: String,
    /// Author date in the author's timezone, `YYYY-MM-DD`
    pub date: String,
    /// First line of the message
    pub summary: String,
    pub timestamp: DateTime<FixedOffset>,
    pub message: String,
}

impl From<&Commit> for CommitSummary {
    fn from(commit: &Commit) -> Self {
        CommitSummary {
            oid: commit.oid().clone(),
            author: commit.author().name().to_string(),
            email: commit.author().email().to_string(),
            date: commit.author().short_date(),
            summary: commit.summary().to_string(),
            timestamp: commit.author().timestamp(),
            message: commit.message().to_string(),
        }
    }
}

/// Both ends of a "HEAD versus N commits back" comparison
#[derive(Debug, Clone)]
pub(crate) struct CommitRange {
    pub old: Arc<Commit>,
    pub new: Arc<Commit>,
}

impl Repository {
    /// Resolve HEAD and its `commits_back`-th first-parent ancestor.
    ///
    /// An unborn HEAD has no ancestors at all, so any request fails with
    /// `RootReached`.
    pub(crate) fn commit_range(&self, commits_back: usize) -> Result<CommitRange> {
        let head = self.head_oid()?.ok_or(GitError::RootReached {
            requested: commits_back,
            depth: 0,
        })?;

        let new = self.database().load_commit(&head)?;
        let old = nth_ancestor(self.database(), &head, commits_back)?;

        Ok(CommitRange { old, new })
    }
}

/// Resolve a user-supplied path to a path inside the repository, so `./a/b`,
/// `a//b/` and `x/../a/b` all name `a/b`. Absolute paths and paths that
/// climb above the repository root name nothing.
pub(crate) fn normalize_path(path: &Path) -> Result<PathBuf> {
    let not_found = || GitError::PathNotFound {
        path: path.to_path_buf(),
    };
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(not_found());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(not_found()),
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(not_found());
    }

    Ok(normalized)
}
