//! Core repository components
//!
//! - `database`: object lookup across loose storage, packs and alternates
//! - `refs`: HEAD and branch resolution
//! - `repository`: repository discovery and the handle commands run against

pub mod database;
pub mod refs;
pub mod repository;
