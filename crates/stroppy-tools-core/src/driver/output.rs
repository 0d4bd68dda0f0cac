//! Captured process output and the stdout/stderr merge rule.

use serde::{Deserialize, Serialize};

/// Trimmed text of the two output channels of one driver run.
///
/// A channel that is empty after trimming is `None`. k6 writes its progress
/// and most diagnostics to stderr, so both channels are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    /// Primary channel (stdout).
    pub primary: Option<String>,
    /// Diagnostic channel (stderr).
    pub diagnostic: Option<String>,
}

impl CapturedOutput {
    pub fn new(primary: &str, diagnostic: &str) -> Self {
        CapturedOutput {
            primary: non_empty(primary),
            diagnostic: non_empty(diagnostic),
        }
    }

    /// Decode raw channel bytes, replacing invalid UTF-8.
    pub fn from_bytes(stdout: &[u8], stderr: &[u8]) -> Self {
        Self::new(
            &String::from_utf8_lossy(stdout),
            &String::from_utf8_lossy(stderr),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.diagnostic.is_none()
    }

    /// Primary text, then diagnostic text, newline-joined only when both exist.
    pub fn merge(&self) -> String {
        match (&self.primary, &self.diagnostic) {
            (Some(primary), Some(diagnostic)) => format!("{primary}\n{diagnostic}"),
            (Some(text), None) | (None, Some(text)) => text.clone(),
            (None, None) => String::new(),
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
