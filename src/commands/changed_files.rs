use crate::areas::repository::Repository;
use crate::artifacts::diff::path_filter::PathFilter;
use crate::artifacts::diff::tree_diff::ChangeSet;
use crate::errors::Result;

impl Repository {
    /// Files that differ between the `commits_back`-th ancestor of HEAD and
    /// HEAD, in path order. Zero commits back compares HEAD with itself.
    #[tracing::instrument(skip(self))]
    pub fn list_changed_files(&self, commits_back: usize) -> Result<ChangeSet> {
        let range = self.commit_range(commits_back)?;

        let tree_diff = self.database().tree_diff(
            Some(range.old.tree_oid()),
            Some(range.new.tree_oid()),
            &PathFilter::empty(),
        )?;
        tracing::debug!(
            from = %range.old.oid(),
            to = %range.new.oid(),
            changes = tree_diff.changes().len(),
            "compared trees"
        );

        Ok(tree_diff.into_changes())
    }
}
