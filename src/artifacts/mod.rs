//! Git data structures and algorithms
//!
//! - `diff`: tree comparison and Myers' line diff
//! - `log`: first-parent history traversal
//! - `objects`: Git object types (blob, tree, commit)
//! - `pack`: pack index and pack file decoding, delta replay

pub mod diff;
pub mod log;
pub mod objects;
pub mod pack;
