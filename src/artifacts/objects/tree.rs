//! Git tree object
//!
//! Trees represent directory snapshots in Git. They contain entries for files (blobs)
//! and subdirectories (other trees), along with their names and modes.
//!
//! ## Format
//!
//! Payload: a sequence of entries, each `<octal-mode> <name>\0<raw-id>`.
//!
//! A tree knows only its own entry names; full paths are built by whoever
//! walks it.

use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{GitError, Result};
use bytes::Bytes;
use derive_new::new;
use std::io::{BufRead, Cursor};

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct TreeEntry {
    pub name: String,
    pub mode: EntryMode,
    pub oid: ObjectId,
}

impl TreeEntry {
    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }

    pub fn is_blob(&self) -> bool {
        self.mode.is_blob()
    }

    /// Kind of the child object this entry points at
    pub fn child_type(&self) -> ObjectType {
        match self.mode {
            EntryMode::Directory => ObjectType::Tree,
            EntryMode::File(_) => ObjectType::Blob,
            EntryMode::Gitlink => ObjectType::Commit,
        }
    }
}

/// Git tree object representing a directory snapshot
///
/// Entries are kept in the order they are stored, which is git's canonical
/// tree order; names are unique within a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn entries(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}

impl Unpackable for Tree {
    fn deserialize(oid: &ObjectId, payload: Bytes) -> Result<Self> {
        let algorithm = oid.algorithm();
        let mut reader = Cursor::new(payload);
        let mut entries = Vec::new();

        // Reuse scratch buffers to reduce allocs
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if mode_bytes.pop() != Some(b' ') {
                return Err(GitError::corrupt(oid, "unexpected EOF in tree entry mode"));
            }

            let mode = std::str::from_utf8(&mode_bytes)
                .ok()
                .and_then(EntryMode::from_octal_str)
                .ok_or_else(|| {
                    GitError::corrupt(
                        oid,
                        format!(
                            "invalid tree entry mode {:?}",
                            String::from_utf8_lossy(&mode_bytes)
                        ),
                    )
                })?;

            name_bytes.clear();
            reader.read_until(b'\0', &mut name_bytes)?;
            if name_bytes.pop() != Some(b'\0') || name_bytes.is_empty() {
                return Err(GitError::corrupt(oid, "unexpected EOF in tree entry name"));
            }
            let name = String::from_utf8_lossy(&name_bytes).into_owned();

            let child = ObjectId::read_raw_from(&mut reader, algorithm)
                .map_err(|_| GitError::corrupt(oid, "unexpected EOF in tree entry id"))?;

            entries.push(TreeEntry::new(name, mode, child));
        }

        Ok(Tree { entries })
    }
}
