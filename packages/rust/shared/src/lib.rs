//! Shared types, error model, and configuration for dataembed.
//!
//! This crate is the foundation depended on by all other dataembed crates.
//! It provides:
//! - [`EmbedError`]: the unified error type
//! - Domain types ([`RawCell`], [`NormalizedValue`], [`DataRecord`], [`LiteralSpan`], ...)
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, DatasetEntry, DatasetSpec, DefaultsConfig, LoadedConfig,
    Orientation, PipelineConfig, SignPolicy, StoreOptions, config_dir, find_config, init_config,
    load_config, load_config_from,
};
pub use error::{EmbedError, Result};
pub use types::{
    AnchorRegion, AnchorSpec, BackupRecord, CellValue, DataRecord, LiteralSpan, NormalizedValue,
    Number, RawCell, SourceTable,
};
