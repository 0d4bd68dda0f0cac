//! Driver execution with cancellation.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::{DriverError, DriverResult};
use super::invocation::{merged_environment, Invocation};
use super::output::CapturedOutput;
use super::resolve::{resolve_driver, DriverConfig, ResolvedDriver, SearchPath};

/// Outcome of a driver process that ran to completion.
#[derive(Debug, Clone)]
pub struct Execution {
    /// Binary that was run.
    pub driver: ResolvedDriver,

    /// Exit status of the child.
    pub status: ExitStatus,

    /// Trimmed stdout/stderr.
    pub output: CapturedOutput,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl Execution {
    /// Whether the driver exited with status 0.
    pub fn succeeded(&self) -> bool {
        self.status.success()
    }

    /// Merged output on success, `NonZeroExit` carrying it otherwise.
    pub fn into_result(self) -> DriverResult<String> {
        let output = self.output.merge();
        if self.succeeded() {
            Ok(output)
        } else {
            Err(DriverError::NonZeroExit {
                status: self.status,
                output,
            })
        }
    }
}

/// Resolves and runs the stroppy driver.
///
/// Holds only an immutable configuration snapshot, so one runner can serve
/// any number of concurrent calls; each call spawns its own child.
#[derive(Debug, Clone)]
pub struct DriverRunner {
    config: DriverConfig,
    search: SearchPath,
    pinned: Option<ResolvedDriver>,
}

impl DriverRunner {
    pub fn new(config: DriverConfig, search: SearchPath) -> Self {
        DriverRunner {
            config,
            search,
            pinned: None,
        }
    }

    /// Runner configured from `STROPPY_BIN`, the working directory and `PATH`.
    pub fn from_env() -> Self {
        Self::new(DriverConfig::from_env(), SearchPath::from_env())
    }

    /// Runner that always uses `driver`, skipping resolution.
    pub fn with_driver(driver: ResolvedDriver) -> Self {
        DriverRunner {
            config: DriverConfig::default(),
            search: SearchPath::default(),
            pinned: Some(driver),
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Locate the driver binary for the next call.
    pub fn resolve(&self) -> DriverResult<ResolvedDriver> {
        match &self.pinned {
            Some(driver) => Ok(driver.clone()),
            None => resolve_driver(&self.config, &self.search),
        }
    }

    /// Resolve the driver, run `invocation` and return the merged output.
    pub async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> DriverResult<String> {
        let driver = self.resolve()?;
        execute(&driver, invocation, cancel).await?.into_result()
    }
}

/// Run `driver` with `invocation` until it exits or `cancel` fires.
///
/// Arguments are handed to the OS directly, never through a shell. The child
/// environment is the inherited environment with the invocation overlay on
/// top. On cancellation the child is killed and `Cancelled` is returned with
/// the output collected up to that point.
pub async fn execute(
    driver: &ResolvedDriver,
    invocation: &Invocation,
    cancel: &CancellationToken,
) -> DriverResult<Execution> {
    if cancel.is_cancelled() {
        return Err(DriverError::Cancelled {
            output: String::new(),
        });
    }

    let start = Instant::now();
    info!(
        "Running {} {}",
        driver.path.display(),
        invocation.args.join(" ")
    );
    if !invocation.env.is_empty() {
        let keys: Vec<&str> = invocation.env.keys().map(String::as_str).collect();
        debug!("Environment overlay: {}", keys.join(", "));
    }

    let env = merged_environment(std::env::vars_os(), &invocation.env);
    let mut child = Command::new(&driver.path)
        .args(&invocation.args)
        .env_clear()
        .envs(&env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| DriverError::LaunchFailed {
            path: driver.path.clone(),
            source,
        })?;
    let pipes = OutputPipes::spawn(&mut child);

    let status = tokio::select! {
        status = child.wait() => Some(status?),
        _ = cancel.cancelled() => None,
    };

    let Some(status) = status else {
        warn!(
            "Cancelled {} after {}ms; killing child",
            driver.path.display(),
            start.elapsed().as_millis()
        );
        if let Err(e) = child.kill().await {
            warn!("Failed to kill {}: {}", driver.path.display(), e);
        }
        let output = pipes.finish_within(DRAIN_GRACE).await;
        return Err(DriverError::Cancelled {
            output: output.merge(),
        });
    };

    let output = pipes.finish().await?;
    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    debug!("Driver exited with {} after {}ms", status, duration_ms);

    Ok(Execution {
        driver: driver.clone(),
        status,
        output,
        duration_ms,
    })
}

/// How long a killed driver's pipes are drained before giving up. Grandchildren
/// that inherited the pipes can keep them open past the kill.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Bytes read so far from one pipe.
#[derive(Debug, Clone, Default)]
struct PipeBuffer(Arc<Mutex<Vec<u8>>>);

/// Background readers draining stdout and stderr of a child.
struct OutputPipes {
    stdout: PipeBuffer,
    stderr: PipeBuffer,
    readers: [JoinHandle<io::Result<()>>; 2],
}

impl OutputPipes {
    fn spawn(child: &mut Child) -> Self {
        let stdout = PipeBuffer::default();
        let stderr = PipeBuffer::default();
        let readers = [
            tokio::spawn(drain(child.stdout.take(), stdout.clone())),
            tokio::spawn(drain(child.stderr.take(), stderr.clone())),
        ];
        OutputPipes {
            stdout,
            stderr,
            readers,
        }
    }

    /// Read both pipes to EOF.
    async fn finish(self) -> DriverResult<CapturedOutput> {
        let OutputPipes {
            stdout,
            stderr,
            readers,
        } = self;
        for reader in readers {
            reader
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;
        }
        Ok(snapshot(&stdout, &stderr).await)
    }

    /// Best-effort drain: whatever was read once the pipes close or `grace`
    /// runs out.
    async fn finish_within(mut self, grace: Duration) -> CapturedOutput {
        let drained = tokio::time::timeout(grace, async {
            for reader in self.readers.iter_mut() {
                if let Ok(Err(e)) = reader.await {
                    debug!("Stopped reading driver output: {}", e);
                }
            }
        })
        .await;

        if drained.is_err() {
            debug!("Driver pipes still open after {:?}; keeping partial output", grace);
            for reader in &self.readers {
                reader.abort();
            }
        }
        snapshot(&self.stdout, &self.stderr).await
    }
}

async fn drain<R>(pipe: Option<R>, buffer: PipeBuffer) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(mut pipe) = pipe else {
        return Ok(());
    };
    let mut chunk = [0u8; 8192];
    loop {
        let n = pipe.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buffer.0.lock().await.extend_from_slice(&chunk[..n]);
    }
}

async fn snapshot(stdout: &PipeBuffer, stderr: &PipeBuffer) -> CapturedOutput {
    let stdout = stdout.0.lock().await;
    let stderr = stderr.0.lock().await;
    CapturedOutput::from_bytes(&stdout, &stderr)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    fn execution(raw_status: i32, stdout: &str, stderr: &str) -> Execution {
        Execution {
            driver: ResolvedDriver::fixed("/usr/local/bin/stroppy"),
            status: ExitStatus::from_raw(raw_status),
            output: CapturedOutput::new(stdout, stderr),
            duration_ms: 10,
        }
    }

    #[test]
    fn test_success_returns_merged_output() {
        let result = execution(0, "done\n", "progress\n").into_result().unwrap();
        assert_eq!(result, "done\nprogress");
    }

    #[test]
    fn test_failure_keeps_output() {
        // Raw wait status 256 is exit code 1.
        let err = execution(256, "", "ERRO script error\n")
            .into_result()
            .unwrap_err();

        assert_eq!(err.output(), Some("ERRO script error"));
        match &err {
            DriverError::NonZeroExit { status, output } => {
                assert_eq!(status.code(), Some(1));
                assert_eq!(output, "ERRO script error");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().ends_with("\nERRO script error"));
    }

    #[test]
    fn test_failure_without_output() {
        let err = execution(256, "", "").into_result().unwrap_err();
        assert!(err.output().is_none());
        assert!(!err.to_string().contains('\n'));
    }

    #[test]
    fn test_pinned_driver_skips_resolution() {
        let runner = DriverRunner::with_driver(ResolvedDriver::fixed("/opt/stroppy"));
        let driver = runner.resolve().unwrap();
        assert_eq!(driver.path, std::path::PathBuf::from("/opt/stroppy"));
    }
}
