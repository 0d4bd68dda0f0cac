//! Tool entry points a host dispatches to.
//!
//! Each tool takes its parameters as a request struct (deserializable from
//! tool-call arguments), drives the core and returns the text to show the
//! caller. Failures come back as [`ToolError`] values with user-facing
//! messages.

pub mod error;
pub mod files;
pub mod inspect;
pub mod run;
pub mod workspace;

pub use error::{ToolError, ToolResult};
pub use inspect::{inspect_database, ServerReport, TextQuery, SETTINGS};
pub use files::{read_project_file, read_summary, ALLOWED_EXTENSIONS, MAX_FILE_SIZE};
pub use run::{parse_env_pairs, run_benchmark, validate_script, RunRequest, ValidateRequest};
pub use workspace::{generate_workspace, list_files, list_presets, GenRequest, Preset};
