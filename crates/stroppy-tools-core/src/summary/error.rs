//! Error types for k6 summary parsing.

use std::path::PathBuf;

/// Errors produced while reading or parsing a k6 summary.
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    /// The document is not JSON of the expected shape.
    #[error("malformed k6 summary: {0}")]
    Malformed(String),

    /// The document has no `metrics` field.
    #[error("no metrics found in k6 summary")]
    Empty,

    /// The summary file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for SummaryError {
    fn from(err: serde_json::Error) -> Self {
        SummaryError::Malformed(err.to_string())
    }
}

/// Result type for summary operations.
pub type SummaryResult<T> = std::result::Result<T, SummaryError>;
