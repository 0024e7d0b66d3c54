//! Git object types
//!
//! Git stores all content as objects identified by their hash. The engine
//! decodes three of them:
//!
//! - **Blob**: File content (raw bytes)
//! - **Tree**: Directory listing (names, modes, and object IDs)
//! - **Commit**: Snapshot with metadata (author, message, parent commits, tree)
//!
//! Annotated tags exist in storage but are not part of the decoded union.
//! Every object is stored as `<type> <size>\0<content>`.

pub mod blob;
pub mod commit;
pub mod entry_mode;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;
