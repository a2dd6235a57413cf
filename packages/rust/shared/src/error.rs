//! Error types for dataembed.
//!
//! Library crates use [`EmbedError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Malformed cell values never surface as errors; the normalizer classifies
//! them as `Null` or `Text`.

use std::path::PathBuf;

/// Top-level error type for all dataembed operations.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Source table could not be read into rows of cells.
    #[error("table error: {message}")]
    Table { message: String },

    /// No balanced literal could be found for a declared variable.
    #[error("malformed literal for `{variable}`: {reason}")]
    MalformedLiteral { variable: String, reason: String },

    /// The splice target lacks the marker comment or the script block after it.
    #[error("anchor not found: {marker}")]
    AnchorNotFound { marker: String },

    /// Revert requested for a document that was never backed up.
    #[error("no backup found for {document:?}")]
    BackupMissing { document: PathBuf },

    /// Data validation error (duplicate names, invalid patterns, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EmbedError>;

impl EmbedError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a table error from any displayable message.
    pub fn table(msg: impl Into<String>) -> Self {
        Self::Table {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-friendly label, used in run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Io { .. } => "io",
            Self::Table { .. } => "table",
            Self::MalformedLiteral { .. } => "malformed-literal",
            Self::AnchorNotFound { .. } => "anchor-not-found",
            Self::BackupMissing { .. } => "backup-missing",
            Self::Validation { .. } => "validation",
        }
    }
}
