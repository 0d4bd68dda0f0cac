//! Reading benchmark artifacts and project files.

use std::path::Path;

use tracing::debug;

use crate::summary::{format_summary, SummaryError};

use super::error::{ToolError, ToolResult};

/// Extensions `read_project_file` accepts, lowercase and without the dot.
pub const ALLOWED_EXTENSIONS: [&str; 12] = [
    "ts", "sql", "yaml", "yml", "json", "toml", "txt", "md", "js", "cfg", "conf", "env",
];

/// Largest file `read_project_file` returns.
pub const MAX_FILE_SIZE: u64 = 100 * 1024;

pub(crate) fn allowed_extensions_list() -> String {
    ALLOWED_EXTENSIONS.map(|ext| format!(".{ext}")).join(", ")
}

/// Read a k6 JSON summary from disk and render it as text.
pub fn read_summary(path: &Path) -> ToolResult<String> {
    let bytes = std::fs::read(path).map_err(|source| SummaryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Read {} bytes of k6 summary from {:?}", bytes.len(), path);
    Ok(format_summary(&bytes)?)
}

/// Read a script, SQL or config file of a benchmark workspace.
///
/// Only text formats listed in [`ALLOWED_EXTENSIONS`] up to
/// [`MAX_FILE_SIZE`] bytes are returned.
pub fn read_project_file(path: &Path) -> ToolResult<String> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.iter().any(|allowed| *allowed == extension) {
        return Err(ToolError::UnsupportedExtension {
            extension: if extension.is_empty() {
                extension
            } else {
                format!(".{extension}")
            },
        });
    }

    let io_err = |source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    };
    let size = std::fs::metadata(path).map_err(io_err)?.len();
    if size > MAX_FILE_SIZE {
        return Err(ToolError::FileTooLarge {
            size,
            max: MAX_FILE_SIZE,
        });
    }

    let bytes = std::fs::read(path).map_err(io_err)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
