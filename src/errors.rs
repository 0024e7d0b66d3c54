//! Error kinds raised by the object store, the history walker and the differs.
//!
//! Every error is terminal for the query that raised it. The calling layer
//! decides how to present each kind; [`GitError::kind`] lets it branch without
//! matching on message text.

use crate::artifacts::objects::object_id::ObjectId;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RepositoryNotFound,
    ObjectNotFound,
    CorruptObject,
    RootReached,
    PathNotFound,
    InvalidRef,
    Io,
    Cancelled,
    Worker,
}

#[derive(Debug, Error)]
pub enum GitError {
    #[error("not a git repository: {}", path.display())]
    RepositoryNotFound { path: PathBuf },

    #[error("object {oid} not found{}", display_path(path))]
    ObjectNotFound {
        oid: ObjectId,
        path: Option<PathBuf>,
    },

    #[error("corrupt object {oid}: {reason}{}", display_path(path))]
    CorruptObject {
        oid: ObjectId,
        reason: String,
        path: Option<PathBuf>,
    },

    #[error("corrupt pack {}: {reason}", path.display())]
    CorruptPack { path: PathBuf, reason: String },

    #[error("reached root commit after {depth} of {requested} steps")]
    RootReached { requested: usize, depth: usize },

    #[error("path not found: {}", path.display())]
    PathNotFound { path: PathBuf },

    #[error("invalid reference {name}: {reason}")]
    InvalidRef { name: String, reason: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("traversal cancelled")]
    Cancelled,

    #[error("diff worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, GitError>;

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" (at {})", path.display()),
        None => String::new(),
    }
}

impl GitError {
    pub fn corrupt(oid: &ObjectId, reason: impl Into<String>) -> Self {
        GitError::CorruptObject {
            oid: oid.clone(),
            reason: reason.into(),
            path: None,
        }
    }

    pub fn not_found(oid: &ObjectId) -> Self {
        GitError::ObjectNotFound {
            oid: oid.clone(),
            path: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GitError::RepositoryNotFound { .. } => ErrorKind::RepositoryNotFound,
            GitError::ObjectNotFound { .. } => ErrorKind::ObjectNotFound,
            GitError::CorruptObject { .. } | GitError::CorruptPack { .. } => {
                ErrorKind::CorruptObject
            }
            GitError::RootReached { .. } => ErrorKind::RootReached,
            GitError::PathNotFound { .. } => ErrorKind::PathNotFound,
            GitError::InvalidRef { .. } => ErrorKind::InvalidRef,
            GitError::Io(_) => ErrorKind::Io,
            GitError::Cancelled => ErrorKind::Cancelled,
            GitError::Worker(_) => ErrorKind::Worker,
        }
    }

    /// Attach the tree path being compared when the error was raised.
    ///
    /// The innermost path wins: an error that already carries a path keeps it.
    pub fn at_path(self, at: &Path) -> Self {
        match self {
            GitError::ObjectNotFound { oid, path: None } => GitError::ObjectNotFound {
                oid,
                path: Some(at.to_path_buf()),
            },
            GitError::CorruptObject {
                oid,
                reason,
                path: None,
            } => GitError::CorruptObject {
                oid,
                reason,
                path: Some(at.to_path_buf()),
            },
            other => other,
        }
    }
}
