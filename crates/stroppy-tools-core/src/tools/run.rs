//! `stroppy run` based tools: benchmark runs and dry-run validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::driver::{DriverRunner, Invocation};

use super::error::{ToolError, ToolResult};

/// Script duration, read by the stroppy presets.
pub const DURATION_VAR: &str = "DURATION";
/// Database connection URL.
pub const DRIVER_URL_VAR: &str = "DRIVER_URL";
/// Enables the k6 web dashboard.
pub const DASHBOARD_VAR: &str = "K6_WEB_DASHBOARD";
/// Where k6 exports the dashboard as HTML when the run ends.
pub const DASHBOARD_EXPORT_VAR: &str = "K6_WEB_DASHBOARD_EXPORT";

/// Parameters of a stress-test run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunRequest {
    /// Path to the `.ts` test script.
    pub script: String,
    /// Path to a `.sql` file, for workloads that need one.
    pub sql_file: Option<String>,
    /// Space-separated `KEY=VALUE` pairs for the script.
    pub env: Option<String>,
    /// Test duration, e.g. `30s`.
    pub duration: Option<String>,
    /// Database connection URL.
    pub driver_url: Option<String>,
    /// Export the k6 web dashboard to this HTML file.
    pub report_path: Option<String>,
    /// Extra k6 arguments as one whitespace-separated string.
    pub extra_args: Option<String>,
}

impl RunRequest {
    pub fn new(script: impl Into<String>) -> Self {
        RunRequest {
            script: script.into(),
            ..Self::default()
        }
    }

    /// Build `run <script> [<sql>] [-- <k6 args>]` with its environment overlay.
    ///
    /// Free-form `env` pairs go in first so the dedicated parameters override
    /// them.
    pub fn invocation(&self) -> Invocation {
        let passthrough = self
            .extra_args
            .as_deref()
            .map(|args| args.split_whitespace().collect::<Vec<_>>())
            .unwrap_or_default();

        let mut invocation = Invocation::new("run")
            .arg(&self.script)
            .arg_opt(non_blank(&self.sql_file))
            .passthrough(passthrough);

        if let Some(env) = non_blank(&self.env) {
            invocation.env.extend(parse_env_pairs(env));
        }
        if let Some(url) = non_blank(&self.driver_url) {
            invocation = invocation.env(DRIVER_URL_VAR, url);
        }
        if let Some(duration) = non_blank(&self.duration) {
            invocation = invocation.env(DURATION_VAR, duration);
        }
        if let Some(report) = non_blank(&self.report_path) {
            invocation = invocation
                .env(DASHBOARD_VAR, "true")
                .env(DASHBOARD_EXPORT_VAR, report);
        }
        invocation
    }
}

/// Parameters of a dry-run check of a script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateRequest {
    pub script: String,
    pub sql_file: Option<String>,
}

impl ValidateRequest {
    pub fn new(script: impl Into<String>) -> Self {
        ValidateRequest {
            script: script.into(),
            sql_file: None,
        }
    }

    /// Run zero iterations so only transpiling and parsing happen.
    pub fn invocation(&self) -> Invocation {
        Invocation::new("run")
            .arg(&self.script)
            .arg_opt(non_blank(&self.sql_file))
            .passthrough(["--iterations", "0", "--duration", "1s"])
    }
}

/// Parse space-separated `KEY=VALUE` pairs. Tokens without `=` or with an
/// empty key are dropped.
pub fn parse_env_pairs(input: &str) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    for pair in input.split_whitespace() {
        match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                env.insert(key.to_string(), value.to_string());
            }
            _ => debug!("Ignoring env token {:?}", pair),
        }
    }
    env
}

/// Run a stress test and return the driver's end-of-run output.
pub async fn run_benchmark(
    runner: &DriverRunner,
    request: &RunRequest,
    cancel: &CancellationToken,
) -> ToolResult<String> {
    runner
        .run(&request.invocation(), cancel)
        .await
        .map_err(ToolError::driver("stroppy run"))
}

/// Dry-run a script to surface transpile and parse errors.
pub async fn validate_script(
    runner: &DriverRunner,
    request: &ValidateRequest,
    cancel: &CancellationToken,
) -> ToolResult<String> {
    let output = runner
        .run(&request.invocation(), cancel)
        .await
        .map_err(ToolError::driver("validation"))?;
    Ok(format!("Validation passed.\n\n{output}"))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_run_invocation() {
        let inv = RunRequest::new("bench/tpcc.ts").invocation();
        assert_eq!(inv.args, vec!["run", "bench/tpcc.ts"]);
        assert!(inv.env.is_empty());
    }

    #[test]
    fn test_full_run_invocation() {
        let request = RunRequest {
            script: "tpcc.ts".to_string(),
            sql_file: Some("tpcc.sql".to_string()),
            env: Some("VUS_SCALE=5  WAREHOUSES=10 junk DURATION=1h".to_string()),
            duration: Some("30s".to_string()),
            driver_url: Some("postgres://u:p@localhost:5432/db".to_string()),
            report_path: Some("/tmp/report.html".to_string()),
            extra_args: Some("--iterations 100  --no-teardown".to_string()),
        };

        let inv = request.invocation();
        assert_eq!(
            inv.args,
            vec![
                "run",
                "tpcc.ts",
                "tpcc.sql",
                "--",
                "--iterations",
                "100",
                "--no-teardown"
            ]
        );
        assert_eq!(inv.env["VUS_SCALE"], "5");
        assert_eq!(inv.env["WAREHOUSES"], "10");
        assert_eq!(inv.env[DURATION_VAR], "30s");
        assert_eq!(inv.env[DRIVER_URL_VAR], "postgres://u:p@localhost:5432/db");
        assert_eq!(inv.env[DASHBOARD_VAR], "true");
        assert_eq!(inv.env[DASHBOARD_EXPORT_VAR], "/tmp/report.html");
        assert_eq!(inv.env.len(), 6);
    }

    #[test]
    fn test_blank_parameters_are_ignored() {
        let request = RunRequest {
            sql_file: Some(String::new()),
            extra_args: Some("   ".to_string()),
            duration: Some(String::new()),
            ..RunRequest::new("simple.ts")
        };
        let inv = request.invocation();
        assert_eq!(inv.args, vec!["run", "simple.ts"]);
        assert!(inv.env.is_empty());
    }

    #[test]
    fn test_validate_invocation() {
        let mut request = ValidateRequest::new("simple.ts");
        request.sql_file = Some("simple.sql".to_string());
        assert_eq!(
            request.invocation().args,
            vec![
                "run",
                "simple.ts",
                "simple.sql",
                "--",
                "--iterations",
                "0",
                "--duration",
                "1s"
            ]
        );
    }

    #[test]
    fn test_parse_env_pairs() {
        let env = parse_env_pairs("A=1 B= =skip C=x=y noequals");
        assert_eq!(env.len(), 3);
        assert_eq!(env["A"], "1");
        assert_eq!(env["B"], "");
        assert_eq!(env["C"], "x=y");
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: RunRequest =
            serde_json::from_str(r#"{"script": "a.ts", "duration": "5m"}"#).unwrap();
        assert_eq!(request.script, "a.ts");
        assert_eq!(request.duration.as_deref(), Some("5m"));
        assert!(request.sql_file.is_none());
    }
}
