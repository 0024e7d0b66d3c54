use crate::areas::database::Database;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{GitError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation signal, polled once per walk step
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Lazy first-parent walk starting at a commit (inclusive).
///
/// Each `RevList` is an independent cursor; build another one to restart.
/// The walk ends after the root commit, or after yielding the first error.
#[derive(Debug, Clone)]
pub struct RevList<'r> {
    database: &'r Database,
    current_commit_oid: Option<ObjectId>,
    cancel: Option<CancelFlag>,
}

impl<'r> RevList<'r> {
    /// Start a walk at `start`; `None` (an unborn branch) yields nothing.
    pub fn new(database: &'r Database, start: Option<ObjectId>) -> Self {
        RevList {
            database,
            current_commit_oid: start,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

impl Iterator for RevList<'_> {
    type Item = Result<Arc<Commit>>;

    fn next(&mut self) -> Option<Self::Item> {
        let commit_oid = self.current_commit_oid.take()?;

        if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
            tracing::debug!(at = %commit_oid, "history walk cancelled");
            return Some(Err(GitError::Cancelled));
        }

        match self.database.load_commit(&commit_oid) {
            Ok(commit) => {
                self.current_commit_oid = commit.parent().cloned();
                Some(Ok(commit))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// The commit `n` first-parent steps behind `start`.
///
/// Fails with [`GitError::RootReached`] when the root is hit first.
pub fn nth_ancestor(database: &Database, start: &ObjectId, n: usize) -> Result<Arc<Commit>> {
    let mut commit = database.load_commit(start)?;

    for depth in 0..n {
        let Some(parent) = commit.parent() else {
            return Err(GitError::RootReached {
                requested: n,
                depth,
            });
        };
        commit = database.load_commit(parent)?;
    }

    Ok(commit)
}
