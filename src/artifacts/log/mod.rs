//! Commit history traversal
//!
//! - `rev_list`: first-parent walk from a starting commit, and `nth_ancestor`
//!
//! ## Policy
//!
//! History is followed strictly through each commit's first parent. "N
//! commits back" from a merge is otherwise ambiguous, so merged-in side
//! branches are never visited.

pub mod rev_list;
