//! Stroppy Tools CLI
//!
//! The `stroppy-tools` command exposes the stroppy adapter tools from a shell.
//!
//! ## Commands
//!
//! - `run`: execute a stress test
//! - `validate`: dry-run a script for transpile/parse errors
//! - `gen`: scaffold a workspace from a preset
//! - `presets`: list workload presets
//! - `inspect`: report PostgreSQL version, settings and size
//! - `summary`: render a k6 JSON summary
//! - `read-file`: print a workspace file

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stroppy_tools_core::driver::{DriverConfig, DriverRunner, SearchPath, OVERRIDE_VAR};
use stroppy_tools_core::tools::{
    generate_workspace, inspect_database, list_presets, read_project_file, read_summary,
    run_benchmark, validate_script, GenRequest, Preset, RunRequest, ValidateRequest,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "stroppy-tools")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run stroppy benchmarks and summarize k6 results", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Path to the stroppy binary (overrides build/stroppy and PATH)
    #[arg(long, global = true, env = OVERRIDE_VAR)]
    stroppy_bin: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a stress test and print the end-of-run summary
    Run {
        /// Path to the .ts test script
        script: String,

        /// Path to a .sql file (required for some workloads)
        #[arg(long)]
        sql_file: Option<String>,

        /// Script variables as space-separated KEY=VALUE pairs, e.g. 'VUS_SCALE=5 WAREHOUSES=10'
        #[arg(long)]
        env: Option<String>,

        /// Test duration (sets DURATION), e.g. '30s', '5m'
        #[arg(long)]
        duration: Option<String>,

        /// Database connection URL (sets DRIVER_URL)
        #[arg(long)]
        driver_url: Option<String>,

        /// Export the k6 web dashboard to this HTML file
        #[arg(long)]
        report_path: Option<String>,

        /// Additional k6 arguments as one string, e.g. '--iterations 100 --no-teardown'
        #[arg(long, allow_hyphen_values = true)]
        extra_args: Option<String>,
    },

    /// Dry-run a script to check for transpile/parse errors
    Validate {
        /// Path to the .ts test script
        script: String,

        /// Path to a .sql file (if the script requires one)
        #[arg(long)]
        sql_file: Option<String>,
    },

    /// Scaffold a workspace from a preset
    Gen {
        /// Workload preset (simple, tpcb, tpcc, tpcds, execute_sql)
        #[arg(short, long)]
        preset: Preset,

        /// Target directory for the generated workspace
        #[arg(short, long)]
        workdir: PathBuf,
    },

    /// List available workload presets
    Presets,

    /// Report PostgreSQL version, key settings and database size
    Inspect {
        /// Database connection URL
        #[arg(env = "DRIVER_URL")]
        url: String,
    },

    /// Render a k6 JSON summary file
    Summary {
        /// Path to the k6 JSON summary
        path: PathBuf,
    },

    /// Print a script, SQL or config file (text formats up to 100 KiB)
    ReadFile {
        /// Path to the file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    stroppy_tools_core::init_tracing(cli.json, level);

    let runner = build_runner(cli.stroppy_bin);
    let cancel = cancel_on_ctrl_c();

    let output = match cli.command {
        Commands::Run {
            script,
            sql_file,
            env,
            duration,
            driver_url,
            report_path,
            extra_args,
        } => {
            let request = RunRequest {
                script,
                sql_file,
                env,
                duration,
                driver_url,
                report_path,
                extra_args,
            };
            run_benchmark(&runner, &request, &cancel).await?
        }
        Commands::Validate { script, sql_file } => {
            let request = ValidateRequest { script, sql_file };
            validate_script(&runner, &request, &cancel).await?
        }
        Commands::Gen { preset, workdir } => {
            let request = GenRequest::new(preset, workdir);
            generate_workspace(&runner, &request, &cancel).await?
        }
        Commands::Presets => list_presets(),
        Commands::Inspect { url } => inspect_database(&url).await?,
        Commands::Summary { path } => read_summary(&path)
            .with_context(|| format!("Failed to summarize {:?}", path))?,
        Commands::ReadFile { path } => read_project_file(&path)?,
    };

    println!("{}", output);
    Ok(())
}

/// Runner from the process environment, with `--stroppy-bin` taking the
/// override slot.
fn build_runner(stroppy_bin: Option<PathBuf>) -> DriverRunner {
    let mut config = DriverConfig::from_env();
    if let Some(path) = stroppy_bin {
        config = config.with_override(path);
    }
    DriverRunner::new(config, SearchPath::from_env())
}

/// Token that fires on the first Ctrl-C so a running driver gets killed.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping driver");
            token.cancel();
        }
    });
    cancel
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_k6_args() {
        let cli = Cli::try_parse_from([
            "stroppy-tools",
            "run",
            "tpcc.ts",
            "--duration",
            "30s",
            "--extra-args",
            "--iterations 100",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                script,
                duration,
                extra_args,
                ..
            } => {
                assert_eq!(script, "tpcc.ts");
                assert_eq!(duration.as_deref(), Some("30s"));
                assert_eq!(extra_args.as_deref(), Some("--iterations 100"));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_gen_preset() {
        let cli =
            Cli::try_parse_from(["stroppy-tools", "gen", "-p", "tpcb", "-w", "/tmp/ws"]).unwrap();
        match cli.command {
            Commands::Gen { preset, workdir } => {
                assert_eq!(preset, Preset::Tpcb);
                assert_eq!(workdir, PathBuf::from("/tmp/ws"));
            }
            _ => panic!("expected gen"),
        }
    }

    #[test]
    fn test_unknown_preset_is_rejected() {
        assert!(Cli::try_parse_from(["stroppy-tools", "gen", "-p", "tpch", "-w", "x"]).is_err());
    }

    #[test]
    fn test_parse_inspect_url() {
        let cli =
            Cli::try_parse_from(["stroppy-tools", "inspect", "postgres://localhost/bench"])
                .unwrap();
        match cli.command {
            Commands::Inspect { url } => assert_eq!(url, "postgres://localhost/bench"),
            _ => panic!("expected inspect"),
        }
    }

    #[test]
    fn test_flag_overrides_binary() {
        let runner = build_runner(Some(PathBuf::from("/opt/stroppy")));
        assert_eq!(
            runner.config().override_path,
            Some(PathBuf::from("/opt/stroppy"))
        );
    }
}
