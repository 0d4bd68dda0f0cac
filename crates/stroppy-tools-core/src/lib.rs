//! Stroppy Tools Core
//!
//! Runs the `stroppy` benchmark driver as a subprocess and turns k6 JSON
//! summaries into readable text reports:
//! - [`driver`]: binary resolution, invocation contract, cancellable execution
//! - [`summary`]: k6 summary parsing and report rendering
//! - [`tools`]: request types and entry points for each exposed tool, including
//!   PostgreSQL server inspection

pub mod driver;
pub mod summary;
pub mod telemetry;
pub mod tools;

pub use driver::{
    resolve_driver, CapturedOutput, DriverConfig, DriverError, DriverRunner, DriverSource,
    Invocation, ResolvedDriver, SearchPath,
};
pub use summary::{format_summary, render_summary, Metric, MetricsDocument, SummaryError};
pub use telemetry::init_tracing;
pub use tools::{
    generate_workspace, inspect_database, list_presets, read_project_file, read_summary,
    run_benchmark, validate_script, GenRequest, Preset, RunRequest, ToolError, ValidateRequest,
};

pub use tokio_util::sync::CancellationToken;
