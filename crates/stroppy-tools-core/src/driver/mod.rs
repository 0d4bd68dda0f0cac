//! Stroppy driver invocation.
//!
//! Locates the `stroppy` binary, builds its argument and environment contract,
//! runs it as a child process and merges its stdout/stderr into a single
//! diagnostic text.

pub mod error;
pub mod invocation;
pub mod output;
pub mod resolve;
pub mod runner;

pub use error::{DriverError, DriverResult};
pub use invocation::{merged_environment, Invocation, PASSTHROUGH_SEPARATOR};
pub use output::CapturedOutput;
pub use resolve::{
    resolve_driver, DriverConfig, DriverSource, PathLookup, ResolvedDriver, SearchPath,
    DRIVER_NAME, LOCAL_BUILD, OVERRIDE_VAR,
};
pub use runner::{execute, DriverRunner, Execution};
