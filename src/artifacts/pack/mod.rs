//! Packed object storage
//!
//! - `pack_index`: `.idx` lookup tables (id → pack offset)
//! - `pack_file`: `.pack` entry decoding and delta-chain collection
//! - `delta`: the copy/insert instruction stream that rebuilds deltified objects

pub mod delta;
pub mod pack_file;
pub mod pack_index;
