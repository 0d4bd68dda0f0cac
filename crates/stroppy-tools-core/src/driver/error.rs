//! Error types for driver resolution and execution.

use std::path::PathBuf;
use std::process::ExitStatus;

/// Errors produced while locating or running the stroppy driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// None of the resolution strategies produced a binary.
    #[error(
        "{name} binary not found: set {override_var}, place it in {}, or add it to PATH",
        .local_build.display()
    )]
    NotFound {
        name: String,
        override_var: String,
        local_build: PathBuf,
    },

    /// The binary was found but the process could not be started.
    #[error("failed to launch {}: {source}", .path.display())]
    LaunchFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited with a failure status.
    #[error("driver exited with {status}{}", output_tail(.output))]
    NonZeroExit { status: ExitStatus, output: String },

    /// The caller cancelled the invocation; the child was killed. `output`
    /// holds whatever the child wrote before that.
    #[error("driver invocation cancelled{}", output_tail(.output))]
    Cancelled { output: String },

    /// Collecting the child's output failed after it started.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// Combined output attached to the error, if any was collected.
    pub fn output(&self) -> Option<&str> {
        match self {
            DriverError::NonZeroExit { output, .. } | DriverError::Cancelled { output }
                if !output.is_empty() =>
            {
                Some(output)
            }
            _ => None,
        }
    }
}

fn output_tail(output: &str) -> String {
    if output.is_empty() {
        String::new()
    } else {
        format!("\n{output}")
    }
}

/// Result type for driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;
