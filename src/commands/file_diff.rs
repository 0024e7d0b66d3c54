use crate::areas::database::Database;
use crate::areas::repository::Repository;
use crate::artifacts::diff::line_diff::{LineEdit, diff_lines};
use crate::artifacts::diff::path_filter::PathFilter;
use crate::artifacts::diff::tree_diff::{ChangeKind, TreeChange};
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use crate::commands::normalize_path;
use crate::errors::{GitError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Line diff of one file between two snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilePatch {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub old_oid: Option<ObjectId>,
    pub new_oid: Option<ObjectId>,
    pub old_mode: Option<EntryMode>,
    pub new_mode: Option<EntryMode>,
    /// Either side looks like binary content
    pub binary: bool,
    pub edits: Vec<LineEdit>,
}

impl FilePatch {
    /// Load both sides of `change` and diff them line by line. A missing side
    /// counts as empty content.
    pub fn compute(database: &Database, path: &Path, change: &TreeChange) -> Result<Self> {
        let old_oid = change.old_entry().map(|entry| entry.oid.clone());
        let new_oid = change.new_entry().map(|entry| entry.oid.clone());

        let old = Self::load_side(database, old_oid.as_ref(), path)?;
        let new = Self::load_side(database, new_oid.as_ref(), path)?;

        Ok(FilePatch {
            path: path.to_path_buf(),
            kind: change.kind(),
            old_oid,
            new_oid,
            old_mode: change.old_entry().map(|entry| entry.mode),
            new_mode: change.new_entry().map(|entry| entry.mode),
            binary: old.is_binary() || new.is_binary(),
            edits: diff_lines(old.content(), new.content()),
        })
    }

    fn load_side(database: &Database, oid: Option<&ObjectId>, path: &Path) -> Result<Arc<Blob>> {
        match oid {
            Some(oid) => database.load_blob(oid).map_err(|e| e.at_path(path)),
            None => Ok(Arc::new(Blob::default())),
        }
    }
}

/// Outcome of a single-file comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileDiff {
    Changed(FilePatch),
    /// The file exists in the range but has the same content at both ends
    Unchanged { path: PathBuf },
}

impl Repository {
    /// Line diff of `path` between the `commits_back`-th ancestor of HEAD and HEAD.
    ///
    /// A path that exists but did not change is [`FileDiff::Unchanged`]; a
    /// path that is a file at neither end is `PathNotFound`.
    #[tracing::instrument(skip(self))]
    pub fn file_diff(&self, path: &Path, commits_back: usize) -> Result<FileDiff> {
        let path = normalize_path(path)?;
        let range = self.commit_range(commits_back)?;

        let tree_diff = self.database().tree_diff(
            Some(range.old.tree_oid()),
            Some(range.new.tree_oid()),
            &PathFilter::for_path(&path),
        )?;

        if let Some(change) = tree_diff.changes().get(&path) {
            return Ok(FileDiff::Changed(FilePatch::compute(
                self.database(),
                &path,
                change,
            )?));
        }

        if self.is_file_at(&range.new, &path)? || self.is_file_at(&range.old, &path)? {
            return Ok(FileDiff::Unchanged { path });
        }

        Err(GitError::PathNotFound { path })
    }

    pub(crate) fn is_file_at(&self, commit: &Commit, path: &Path) -> Result<bool> {
        Ok(self
            .database()
            .lookup_path(commit.tree_oid(), path)?
            .is_some_and(|entry| entry.is_blob()))
    }
}
