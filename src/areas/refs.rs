//! Git references (HEAD and branches)
//!
//! References are human-readable names pointing to commits. They are either:
//! - Direct: a full hexadecimal object id
//! - Symbolic: `ref: <name>` pointing to another reference (e.g. HEAD -> refs/heads/main)
//!
//! Loose reference files under the git directory take precedence over the
//! `packed-refs` file, which lists `<oid> <name>` pairs (lines starting with `#`
//! are comments, lines starting with `^` are peeled tag targets).

use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{GitError, Result};
use derive_new::new;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Regex pattern for parsing symbolic references
static SYMREF_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ref: (.+)$").unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

/// Symbolic references are followed at most this many times
const MAX_SYMREF_DEPTH: usize = 5;

/// Value stored in a reference file
#[derive(Debug, Clone, PartialEq, Eq)]
enum SymRefOrOid {
    SymRef(String),
    Oid(ObjectId),
}

/// What HEAD resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// HEAD names a branch that has a commit
    Branch { name: String, oid: ObjectId },
    /// HEAD holds a commit id directly
    Detached(ObjectId),
    /// HEAD names a branch with no commits yet
    Unborn { name: String },
}

impl Head {
    pub fn oid(&self) -> Option<&ObjectId> {
        match self {
            Head::Branch { oid, .. } | Head::Detached(oid) => Some(oid),
            Head::Unborn { .. } => None,
        }
    }
}

#[derive(Debug, new)]
pub struct Refs {
    /// Path to the git directory (typically `.git`)
    path: Box<Path>,
}

impl Refs {
    pub fn head_path(&self) -> Box<Path> {
        self.path.join(HEAD_REF_NAME).into_boxed_path()
    }

    /// Resolve HEAD, following symbolic references.
    pub fn head(&self) -> Result<Head> {
        let mut name = HEAD_REF_NAME.to_string();

        for _ in 0..MAX_SYMREF_DEPTH {
            match self.read_ref_value(&name)? {
                Some(SymRefOrOid::SymRef(target)) => name = target,
                Some(SymRefOrOid::Oid(oid)) if name == HEAD_REF_NAME => {
                    return Ok(Head::Detached(oid));
                }
                Some(SymRefOrOid::Oid(oid)) => return Ok(Head::Branch { name, oid }),
                None if name == HEAD_REF_NAME => {
                    return Err(GitError::InvalidRef {
                        name,
                        reason: "HEAD is missing".to_string(),
                    });
                }
                None => return Ok(Head::Unborn { name }),
            }
        }

        Err(GitError::InvalidRef {
            name,
            reason: format!("symbolic reference nested deeper than {MAX_SYMREF_DEPTH}"),
        })
    }

    /// Commit id HEAD points at, or `None` for an unborn branch.
    pub fn read_head(&self) -> Result<Option<ObjectId>> {
        Ok(self.head()?.oid().cloned())
    }

    fn read_ref_value(&self, name: &str) -> Result<Option<SymRefOrOid>> {
        let content = match std::fs::read_to_string(self.path.join(name)) {
            Ok(content) => content,
            Err(e)
                if e.kind() == std::io::ErrorKind::NotFound
                    || e.kind() == std::io::ErrorKind::IsADirectory =>
            {
                return Ok(self.read_packed_ref(name)?.map(SymRefOrOid::Oid));
            }
            Err(e) => return Err(e.into()),
        };
        let content = content.trim();

        if content.is_empty() {
            return Ok(self.read_packed_ref(name)?.map(SymRefOrOid::Oid));
        }

        if let Some(symref_match) = SYMREF_REGEX.captures(content) {
            return Ok(Some(SymRefOrOid::SymRef(symref_match[1].trim().to_string())));
        }

        ObjectId::try_parse(content)
            .map(|oid| Some(SymRefOrOid::Oid(oid)))
            .map_err(|e| GitError::InvalidRef {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    fn read_packed_ref(&self, name: &str) -> Result<Option<ObjectId>> {
        let content = match std::fs::read_to_string(self.path.join("packed-refs")) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        for line in content.lines() {
            if line.starts_with('#') || line.starts_with('^') {
                continue;
            }

            let Some((oid, ref_name)) = line.split_once(' ') else {
                continue;
            };
            if ref_name.trim() == name {
                return ObjectId::try_parse(oid)
                    .map(Some)
                    .map_err(|e| GitError::InvalidRef {
                        name: name.to_string(),
                        reason: format!("packed-refs: {e}"),
                    });
            }
        }

        Ok(None)
    }
}
