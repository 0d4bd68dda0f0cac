//! Driver binary resolution.
//!
//! Resolution runs over an explicit [`DriverConfig`] snapshot so the order of
//! strategies can be exercised without touching the real process environment:
//! 1. the override path from `STROPPY_BIN`, if something exists there
//! 2. the local build output (`build/stroppy` under the working directory)
//! 3. the executable search path

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::{DriverError, DriverResult};

/// Canonical name of the driver binary.
pub const DRIVER_NAME: &str = "stroppy";

/// Environment variable holding an explicit driver path.
pub const OVERRIDE_VAR: &str = "STROPPY_BIN";

/// Conventional build output, relative to the working directory.
pub const LOCAL_BUILD: &str = "build/stroppy";

/// Snapshot of everything driver resolution depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Binary name looked up on the search path.
    pub name: String,
    /// Name of the override variable, used in error messages.
    pub override_var: String,
    /// Value of the override variable, if set.
    pub override_path: Option<PathBuf>,
    /// Directory the local build candidate is relative to.
    pub working_dir: PathBuf,
    /// Local build candidate, relative to `working_dir`.
    pub local_build: PathBuf,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            name: DRIVER_NAME.to_string(),
            override_var: OVERRIDE_VAR.to_string(),
            override_path: None,
            working_dir: PathBuf::from("."),
            local_build: PathBuf::from(LOCAL_BUILD),
        }
    }
}

impl DriverConfig {
    /// Capture the override variable and working directory of this process.
    pub fn from_env() -> Self {
        let override_path = std::env::var_os(OVERRIDE_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        DriverConfig {
            override_path,
            working_dir,
            ..Self::default()
        }
    }

    /// Set an explicit override path.
    pub fn with_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    /// Set the directory the local build candidate is resolved against.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    fn local_candidate(&self) -> PathBuf {
        self.working_dir.join(&self.local_build)
    }
}

/// Where a resolved driver came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverSource {
    /// Explicit override path.
    Override,
    /// Local build output under the working directory.
    LocalBuild,
    /// Executable search path.
    SearchPath,
}

/// A driver binary that resolution settled on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDriver {
    pub path: PathBuf,
    pub source: DriverSource,
}

impl ResolvedDriver {
    /// Use a fixed binary, bypassing resolution.
    pub fn fixed(path: impl Into<PathBuf>) -> Self {
        ResolvedDriver {
            path: path.into(),
            source: DriverSource::Override,
        }
    }
}

/// Finds a binary by name on some search path.
pub trait PathLookup {
    fn lookup(&self, name: &str) -> Option<PathBuf>;
}

impl<F> PathLookup for F
where
    F: Fn(&str) -> Option<PathBuf>,
{
    fn lookup(&self, name: &str) -> Option<PathBuf> {
        self(name)
    }
}

/// `PATH`-style list of directories.
#[derive(Debug, Clone, Default)]
pub struct SearchPath(Option<OsString>);

impl SearchPath {
    pub fn new(value: impl Into<OsString>) -> Self {
        SearchPath(Some(value.into()))
    }

    /// Capture `PATH` of this process.
    pub fn from_env() -> Self {
        SearchPath(std::env::var_os("PATH"))
    }
}

impl PathLookup for SearchPath {
    fn lookup(&self, name: &str) -> Option<PathBuf> {
        let value = self.0.as_ref()?;
        std::env::split_paths(value)
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate))
    }
}

/// A regular file that, on unix, has at least one execute bit set.
fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Resolve the driver binary; the first strategy that matches wins.
pub fn resolve_driver(
    config: &DriverConfig,
    search: &dyn PathLookup,
) -> DriverResult<ResolvedDriver> {
    if let Some(path) = &config.override_path {
        if exists(path) {
            debug!("Using {} from {}", config.name, config.override_var);
            return Ok(ResolvedDriver {
                path: path.clone(),
                source: DriverSource::Override,
            });
        }
        warn!(
            "{} points at {:?}, which does not exist; falling back",
            config.override_var, path
        );
    }

    let local = config.local_candidate();
    if exists(&local) {
        debug!("Using local build at {:?}", local);
        return Ok(ResolvedDriver {
            path: local,
            source: DriverSource::LocalBuild,
        });
    }

    if let Some(path) = search.lookup(&config.name) {
        debug!("Found {} on search path at {:?}", config.name, path);
        return Ok(ResolvedDriver {
            path,
            source: DriverSource::SearchPath,
        });
    }

    Err(DriverError::NotFound {
        name: config.name.clone(),
        override_var: config.override_var.clone(),
        local_build: config.local_build.clone(),
    })
}

fn exists(path: &Path) -> bool {
    std::fs::metadata(path).is_ok()
}
