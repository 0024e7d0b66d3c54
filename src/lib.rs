//! A read-only git object store reader and diff engine.
//!
//! The crate answers four questions about an on-disk repository without
//! shelling out to git or linking libgit2:
//!
//! - commit history from HEAD (`list_history`)
//! - files changed between HEAD and an ancestor (`list_changed_files`)
//! - a single file's line diff between HEAD and an ancestor (`file_diff`)
//! - a file's full history with per-commit diffs (`file_history`)
//!
//! ## Layout
//!
//! - `areas`: on-disk repository areas (object database, refs, repository handle)
//! - `artifacts`: object types, pack decoding, history traversal and diff algorithms
//! - `commands`: the four query operations built on top of the areas
//! - `report`: text and JSON rendering of command results
//! - `serve`: line-delimited JSON tool server over any async byte streams

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod errors;
pub mod logging;
pub mod report;
pub mod serve;

pub use areas::repository::Repository;
pub use errors::{ErrorKind, GitError, Result};
