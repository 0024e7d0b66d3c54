use crate::areas::repository::Repository;
use crate::artifacts::diff::path_filter::PathFilter;
use crate::artifacts::diff::tree_diff::TreeChange;
use crate::artifacts::log::rev_list::{CancelFlag, RevList};
use crate::artifacts::objects::commit::Commit;
use crate::commands::CommitSummary;
use crate::commands::file_diff::FilePatch;
use crate::commands::normalize_path;
use crate::errors::{GitError, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// One commit that touched a file, with the file's diff against the
/// commit's first parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRevision {
    pub commit: CommitSummary,
    pub patch: FilePatch,
}

impl Repository {
    /// Every commit on HEAD's first-parent chain that changed `path`, newest
    /// first. The root commit is compared against an empty tree.
    ///
    /// Selecting the commits is a sequential walk; their content diffs are
    /// then computed on blocking worker threads and returned in walk order.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn file_history(
        &self,
        path: &Path,
        cancel: Option<CancelFlag>,
    ) -> Result<Vec<FileRevision>> {
        let path = normalize_path(path)?;
        let head = self.head_oid()?;

        let mut walk = RevList::new(self.database(), head.clone());
        if let Some(cancel) = cancel {
            walk = walk.with_cancel(cancel);
        }

        let mut touched = Vec::new();
        let mut newer: Option<Arc<Commit>> = None;
        for commit in walk {
            let commit = commit?;
            if let Some(newer) = newer {
                touched.extend(self.path_change(Some(commit.as_ref()), &newer, &path)?);
            }
            newer = Some(commit);
        }
        if let Some(root) = newer {
            touched.extend(self.path_change(None, &root, &path)?);
        }
        tracing::debug!(commits = touched.len(), "selected commits touching path");

        let workers = touched
            .into_iter()
            .map(|(commit, change)| {
                let database = self.shared_database();
                let path = path.clone();
                tokio::task::spawn_blocking(move || -> Result<FileRevision> {
                    Ok(FileRevision {
                        commit: CommitSummary::from(commit.as_ref()),
                        patch: FilePatch::compute(&database, &path, &change)?,
                    })
                })
            })
            .collect::<Vec<_>>();

        let mut revisions = Vec::with_capacity(workers.len());
        for worker in workers {
            revisions.push(worker.await.map_err(|e| GitError::Worker(e.to_string()))??);
        }

        if revisions.is_empty() {
            let exists_at_head = match &head {
                Some(head) => {
                    let head_commit = self.database().load_commit(head)?;
                    self.is_file_at(&head_commit, &path)?
                }
                None => false,
            };
            if !exists_at_head {
                return Err(GitError::PathNotFound { path });
            }
        }

        Ok(revisions)
    }

    /// How `commit` changed `path` relative to `parent` (an empty tree when
    /// `parent` is `None`), if at all.
    fn path_change(
        &self,
        parent: Option<&Commit>,
        commit: &Arc<Commit>,
        path: &Path,
    ) -> Result<Option<(Arc<Commit>, TreeChange)>> {
        let tree_diff = self.database().tree_diff(
            parent.map(Commit::tree_oid),
            Some(commit.tree_oid()),
            &PathFilter::for_path(path),
        )?;

        let change = tree_diff.into_changes().remove(path);
        Ok(change.map(|change| (commit.clone(), change)))
    }
}
