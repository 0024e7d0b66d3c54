use crate::areas::repository::Repository;
use crate::artifacts::log::rev_list::RevList;
use crate::commands::CommitSummary;
use crate::errors::Result;

/// Number of commits listed when no limit is given
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

impl Repository {
    /// The newest `limit` commits on HEAD's first-parent chain, newest first.
    ///
    /// An unborn HEAD has an empty history.
    #[tracing::instrument(skip(self))]
    pub fn list_history(&self, limit: usize) -> Result<Vec<CommitSummary>> {
        RevList::new(self.database(), self.head_oid()?)
            .take(limit)
            .map(|commit| commit.map(|commit| CommitSummary::from(commit.as_ref())))
            .collect()
    }
}
