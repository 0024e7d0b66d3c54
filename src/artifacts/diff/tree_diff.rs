use crate::areas::database::Database;
use crate::artifacts::diff::path_filter::PathFilter;
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use crate::errors::Result;
use bitflags::bitflags;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct DiffFilter: u32 {
        const ADDED = 0b0001;
        const DELETED = 0b0010;
        const MODIFIED = 0b0100;
    }
}

impl DiffFilter {
    /// Parse a `--filter` argument such as `AM` or `D`.
    pub fn try_parse(s: &str) -> Option<Self> {
        let mut filter = Self::empty();

        for c in s.chars() {
            match c {
                'A' => filter |= Self::ADDED,
                'D' => filter |= Self::DELETED,
                'M' => filter |= Self::MODIFIED,
                _ => return None,
            }
        }

        Some(filter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "Added",
            ChangeKind::Modified => "Modified",
            ChangeKind::Deleted => "Deleted",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file-level change, keeping the entries on either side for content lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    Added(TreeEntry),
    Deleted(TreeEntry),
    Modified { old: TreeEntry, new: TreeEntry },
}

impl TreeChange {
    /// Classify a pair of blob entries. Entries with equal ids are unchanged,
    /// even when their modes differ.
    pub fn from_entries(old: Option<TreeEntry>, new: Option<TreeEntry>) -> Option<Self> {
        match (old, new) {
            (None, Some(new)) => Some(TreeChange::Added(new)),
            (Some(old), None) => Some(TreeChange::Deleted(old)),
            (Some(old), Some(new)) if old.oid != new.oid => Some(TreeChange::Modified { old, new }),
            _ => None,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            TreeChange::Added(_) => ChangeKind::Added,
            TreeChange::Deleted(_) => ChangeKind::Deleted,
            TreeChange::Modified { .. } => ChangeKind::Modified,
        }
    }

    pub fn matches_filter(&self, filter: DiffFilter) -> bool {
        match self {
            TreeChange::Added(_) => filter.contains(DiffFilter::ADDED),
            TreeChange::Deleted(_) => filter.contains(DiffFilter::DELETED),
            TreeChange::Modified { .. } => filter.contains(DiffFilter::MODIFIED),
        }
    }

    pub fn old_entry(&self) -> Option<&TreeEntry> {
        match self {
            TreeChange::Deleted(entry) => Some(entry),
            TreeChange::Modified { old, .. } => Some(old),
            TreeChange::Added(_) => None,
        }
    }

    pub fn new_entry(&self) -> Option<&TreeEntry> {
        match self {
            TreeChange::Added(entry) => Some(entry),
            TreeChange::Modified { new, .. } => Some(new),
            TreeChange::Deleted(_) => None,
        }
    }
}

/// Changes keyed by full path. Paths compare component by component, so
/// `a/b.txt` sorts before `a-b.txt` and `a.txt`, where git's byte order puts
/// it last.
pub type ChangeSet = BTreeMap<PathBuf, TreeChange>;
type TreeEntryMap<'t> = BTreeMap<&'t str, &'t TreeEntry>;

/// Recursive comparison of two trees.
///
/// Subtrees with equal ids are skipped without being loaded. A path that is
/// a file on one side and a directory on the other is reported as the file
/// being deleted (or added) plus every file below the directory.
#[derive(Debug)]
pub struct TreeDiff<'r> {
    database: &'r Database,
    change_set: ChangeSet,
}

impl<'r> TreeDiff<'r> {
    pub fn new(database: &'r Database) -> Self {
        TreeDiff {
            database,
            change_set: BTreeMap::new(),
        }
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.change_set
    }

    pub fn into_changes(self) -> ChangeSet {
        self.change_set
    }

    pub fn compare_oids(
        &mut self,
        old: Option<&ObjectId>,
        new: Option<&ObjectId>,
        prefix: &Path,
        filter: &PathFilter,
    ) -> Result<()> {
        if old == new {
            return Ok(());
        }

        let old_tree = self.load_tree(old, prefix)?;
        let new_tree = self.load_tree(new, prefix)?;
        let old_entries = Self::entry_map(old_tree.as_deref(), filter);
        let new_entries = Self::entry_map(new_tree.as_deref(), filter);

        self.detect_deletions(&old_entries, &new_entries, prefix, filter)?;
        self.detect_additions(&old_entries, &new_entries, prefix, filter)?;

        Ok(())
    }

    fn load_tree(&self, oid: Option<&ObjectId>, prefix: &Path) -> Result<Option<Arc<Tree>>> {
        let Some(oid) = oid else {
            return Ok(None);
        };

        self.database.load_tree(oid).map(Some).map_err(|e| {
            if prefix.as_os_str().is_empty() {
                e
            } else {
                e.at_path(prefix)
            }
        })
    }

    fn entry_map<'t>(tree: Option<&'t Tree>, filter: &PathFilter) -> TreeEntryMap<'t> {
        tree.into_iter()
            .flat_map(Tree::entries)
            .filter(|entry| entry.mode != EntryMode::Gitlink)
            .filter(|entry| filter.matches(&entry.name))
            .map(|entry| (entry.name.as_str(), entry))
            .collect()
    }

    fn blob_side(entry: Option<&TreeEntry>) -> Option<TreeEntry> {
        entry.filter(|entry| !entry.is_tree()).cloned()
    }

    fn tree_side(entry: Option<&TreeEntry>) -> Option<&ObjectId> {
        entry.filter(|entry| entry.is_tree()).map(|entry| &entry.oid)
    }

    fn detect_deletions(
        &mut self,
        old: &TreeEntryMap<'_>,
        new: &TreeEntryMap<'_>,
        prefix: &Path,
        filter: &PathFilter,
    ) -> Result<()> {
        for (name, entry) in old {
            let path = prefix.join(name);
            let other = new.get(name).copied();

            if let Some(other) = other
                && other.oid == entry.oid
                && other.is_tree() == entry.is_tree()
            {
                continue;
            }

            self.compare_oids(
                Self::tree_side(Some(*entry)),
                Self::tree_side(other),
                &path,
                &filter.descend(name),
            )?;

            let change = TreeChange::from_entries(Self::blob_side(Some(*entry)), Self::blob_side(other));
            if let Some(change) = change {
                self.change_set.insert(path, change);
            }
        }

        Ok(())
    }

    fn detect_additions(
        &mut self,
        old: &TreeEntryMap<'_>,
        new: &TreeEntryMap<'_>,
        prefix: &Path,
        filter: &PathFilter,
    ) -> Result<()> {
        for (name, entry) in new {
            if old.contains_key(name) {
                continue;
            }

            let path = prefix.join(name);
            if entry.is_tree() {
                self.compare_oids(None, Some(&entry.oid), &path, &filter.descend(name))?;
            } else {
                self.change_set.insert(path, TreeChange::Added((*entry).clone()));
            }
        }

        Ok(())
    }
}
