//! Workspace scaffolding via `stroppy gen` and the preset catalogue.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::driver::{DriverRunner, Invocation};

use super::error::{ToolError, ToolResult};

/// Workload presets understood by `stroppy gen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Simple,
    Tpcb,
    Tpcc,
    Tpcds,
    ExecuteSql,
}

impl Preset {
    /// Every preset, in listing order.
    pub const ALL: [Preset; 5] = [
        Preset::Simple,
        Preset::Tpcb,
        Preset::Tpcc,
        Preset::Tpcds,
        Preset::ExecuteSql,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Simple => "simple",
            Preset::Tpcb => "tpcb",
            Preset::Tpcc => "tpcc",
            Preset::Tpcds => "tpcds",
            Preset::ExecuteSql => "execute_sql",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Preset::Simple => {
                "Simple insert + query workload, a good starting point for basic DB operations"
            }
            Preset::Tpcb => "TPC-B benchmark, bank-like debit/credit transactions between accounts",
            Preset::Tpcc => "TPC-C benchmark, OLTP workload simulating a wholesale supplier",
            Preset::Tpcds => "TPC-DS benchmark, decision support and analytical queries",
            Preset::ExecuteSql => "Raw SQL execution of arbitrary statements from a file",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|preset| preset.name() == s)
            .ok_or_else(|| ToolError::UnknownPreset(s.to_string()))
    }
}

pub(crate) fn preset_names() -> String {
    Preset::ALL.map(|preset| preset.name()).join(", ")
}

/// Markdown list of the available presets.
pub fn list_presets() -> String {
    let mut text = String::from("Available Stroppy workload presets:\n\n");
    for preset in Preset::ALL {
        text.push_str(&format!("- **{}**: {}\n", preset, preset.description()));
    }
    text
}

/// Parameters of a workspace scaffold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenRequest {
    pub preset: Preset,
    /// Target directory for the generated files.
    pub workdir: PathBuf,
}

impl GenRequest {
    pub fn new(preset: Preset, workdir: impl Into<PathBuf>) -> Self {
        GenRequest {
            preset,
            workdir: workdir.into(),
        }
    }

    pub fn invocation(&self) -> Invocation {
        Invocation::new("gen")
            .arg(format!("--preset={}", self.preset))
            .arg(format!("--workdir={}", self.workdir.display()))
    }
}

/// Scaffold a workspace and list the files that ended up in it.
pub async fn generate_workspace(
    runner: &DriverRunner,
    request: &GenRequest,
    cancel: &CancellationToken,
) -> ToolResult<String> {
    let output = runner
        .run(&request.invocation(), cancel)
        .await
        .map_err(ToolError::driver("stroppy gen"))?;

    let files = match list_files(&request.workdir) {
        Ok(files) => files,
        Err(e) => {
            warn!("Could not list {:?}: {}", request.workdir, e);
            vec!["(could not list files)".to_string()]
        }
    };

    let listing = format!(
        "Workspace generated at {} with preset \"{}\"\n\nGenerated files:\n- {}",
        request.workdir.display(),
        request.preset,
        files.join("\n- ")
    );

    if output.is_empty() {
        Ok(listing)
    } else {
        Ok(format!("{output}\n\n{listing}"))
    }
}

/// Files under `root`, as sorted paths relative to it.
pub fn list_files(root: &Path) -> std::io::Result<Vec<String>> {
    let mut files = Vec::new();
    collect_files(root, root, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<String>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(root, &path, files)?;
        } else {
            let rel = path.strip_prefix(root).unwrap_or(&path);
            files.push(rel.display().to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_preset_names_roundtrip() {
        for preset in Preset::ALL {
            assert_eq!(preset.name().parse::<Preset>().unwrap(), preset);
        }
    }

    #[test]
    fn test_unknown_preset_lists_valid_ones() {
        let err = "tpch".parse::<Preset>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown preset \"tpch\"; valid presets: simple, tpcb, tpcc, tpcds, execute_sql"
        );
    }

    #[test]
    fn test_preset_serde_names() {
        let preset: Preset = serde_json::from_str("\"execute_sql\"").unwrap();
        assert_eq!(preset, Preset::ExecuteSql);
    }

    #[test]
    fn test_list_presets_is_ordered() {
        let text = list_presets();
        let simple = text.find("**simple**").unwrap();
        let tpcds = text.find("**tpcds**").unwrap();
        let exec = text.find("**execute_sql**").unwrap();
        assert!(text.starts_with("Available Stroppy workload presets:\n\n"));
        assert!(simple < tpcds && tpcds < exec);
        assert_eq!(text.lines().filter(|l| l.starts_with("- ")).count(), 5);
    }

    #[test]
    fn test_gen_invocation() {
        let inv = GenRequest::new(Preset::Tpcc, "/tmp/ws").invocation();
        assert_eq!(inv.args, vec!["gen", "--preset=tpcc", "--workdir=/tmp/ws"]);
        assert!(inv.env.is_empty());
    }

    #[test]
    fn test_list_files_sorted_and_relative() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sql")).unwrap();
        std::fs::write(dir.path().join("tpcc.ts"), "").unwrap();
        std::fs::write(dir.path().join("sql/tpcc.sql"), "").unwrap();
        std::fs::write(dir.path().join("config.json"), "").unwrap();

        let files = list_files(dir.path()).unwrap();
        let expected = vec![
            "config.json".to_string(),
            Path::new("sql").join("tpcc.sql").display().to_string(),
            "tpcc.ts".to_string(),
        ];
        assert_eq!(files, expected);
    }

    #[test]
    fn test_list_files_missing_dir() {
        let dir = tempdir().unwrap();
        assert!(list_files(&dir.path().join("nope")).is_err());
    }
}
