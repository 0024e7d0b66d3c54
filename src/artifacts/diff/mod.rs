//! Tree comparison and content diffing
//!
//! - `tree_diff`: which files changed between two trees
//! - `path_filter`: restricts a tree comparison to selected paths
//! - `myers`: Myers' diff over arbitrary sequences
//! - `line_diff`: line splitting, line diffs and unified-diff hunks

pub mod line_diff;
pub mod myers;
pub mod path_filter;
pub mod tree_diff;
