//! Error types for the tool layer.

use std::path::PathBuf;

use crate::driver::DriverError;
use crate::summary::SummaryError;

use super::files::allowed_extensions_list;
use super::workspace::preset_names;

/// Errors returned to a tool caller. Every variant is meant to be shown as is.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// A driver call failed; `action` names the tool, e.g. `stroppy run`.
    /// The driver error, output included, is part of the message.
    #[error("{action} failed: {error}")]
    Driver {
        action: &'static str,
        error: DriverError,
    },

    /// A database query failed; `context` says which step.
    #[error("{context}: {error}")]
    Database {
        context: &'static str,
        error: sqlx::Error,
    },

    #[error(transparent)]
    Summary(#[from] SummaryError),

    #[error("unknown preset {:?}; valid presets: {}", .0, preset_names())]
    UnknownPreset(String),

    #[error(
        "unsupported file extension {:?}; allowed: {}",
        .extension,
        allowed_extensions_list()
    )]
    UnsupportedExtension { extension: String },

    #[error("file too large: {size} bytes (max {max})")]
    FileTooLarge { size: u64, max: u64 },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    pub(crate) fn driver(action: &'static str) -> impl FnOnce(DriverError) -> ToolError {
        move |error| ToolError::Driver { action, error }
    }

    pub(crate) fn database(context: &'static str) -> impl FnOnce(sqlx::Error) -> ToolError {
        move |error| ToolError::Database { context, error }
    }
}

/// Result type for tool operations.
pub type ToolResult<T> = std::result::Result<T, ToolError>;
