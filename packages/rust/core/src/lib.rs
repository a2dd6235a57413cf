//! Pipeline orchestration and file handling for dataembed.
//!
//! This crate ties together table loading, record building, and anchor
//! splicing into end-to-end workflows (`embed_all`, `revert_all`, `status`).

pub mod pipeline;
pub mod splice;
pub mod store;
pub mod table;
