//! Running one test script
//!
//! [`ProcessRunner`] spawns a script as a child process and races its exit against the configured timeout:
//!
//! 1. Spawn with the script's folder as working directory and `TESTBRAIN_TIMEOUT` in the environment.
//! 2. Pump stdout and stderr on two tasks, live into the run's sinks (verbose) or into one shared capture buffer.
//! 3. Wait for the exit and the deadline concurrently. On exit the status is decoded; on deadline the child is
//!    killed and reaped, and a timeout marker is appended to its output.
//! 4. Give the pumps a short grace period to drain, then abort any pump a surviving grandchild keeps open.
//!
//! Exit statuses are normalised by [`ExitOutcome`] so nothing else in the engine looks at platform details.

use std::future::Future;
use std::io::{self, Write};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::discovery::TestScript;
use super::results::TestResult;
use super::sink::{CaptureBuffer, OutputSinks, Sink};

/// Environment variable carrying the timeout, in whole seconds, to every script.
pub const TIMEOUT_ENV: &str = "TESTBRAIN_TIMEOUT";

/// How long output pumps may keep draining after the race resolved.
const PUMP_GRACE: Duration = Duration::from_millis(500);

/// Runs a single test script to completion.
///
/// The engine only talks to this trait, so execution can be replaced (for example by an in-memory fake in tests).
pub trait TestExecutor {
    fn execute(&self, script: &TestScript) -> impl Future<Output = TestResult> + Send;
}

/// Normalised end state of a child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exited on its own with a numeric code
    Exited(i32),
    /// Killed (by a signal or by the timeout) or no numeric code available
    Unknown,
    /// Could not be started or waited on; carries the OS error message
    SpawnFailed(String),
}

impl ExitOutcome {
    pub fn from_status(status: ExitStatus) -> Self {
        platform::decode(status)
    }

    /// Turn the outcome into the test's result.
    pub fn into_result(self, name: &str, output: Option<String>) -> TestResult {
        match self {
            ExitOutcome::Exited(code) => TestResult::exited(name, code, output),
            ExitOutcome::Unknown => TestResult::unknown_exit(name, output),
            ExitOutcome::SpawnFailed(message) => TestResult::errored(name, message),
        }
    }
}

#[cfg(unix)]
mod platform {
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    use super::ExitOutcome;

    pub(super) fn decode(status: ExitStatus) -> ExitOutcome {
        if let Some(code) = status.code() {
            return ExitOutcome::Exited(code);
        }
        match status.signal() {
            Some(signal) => tracing::debug!(signal, "script terminated by signal"),
            None => tracing::debug!(?status, "script status has no exit code"),
        }
        ExitOutcome::Unknown
    }
}

#[cfg(not(unix))]
mod platform {
    use std::process::ExitStatus;

    use super::ExitOutcome;

    pub(super) fn decode(status: ExitStatus) -> ExitOutcome {
        status.code().map_or(ExitOutcome::Unknown, ExitOutcome::Exited)
    }
}

/// Spawns test scripts as child processes under a timeout.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
    verbose: bool,
    sinks: OutputSinks,
}

impl ProcessRunner {
    pub fn new(timeout: Duration, verbose: bool, sinks: OutputSinks) -> Self {
        Self { timeout, verbose, sinks }
    }

    /// Run `script` until it exits or the timeout fires.
    #[tracing::instrument(skip_all, fields(script = %script.name))]
    pub async fn run_script(&self, script: &TestScript) -> TestResult {
        self.run_in(script, script.working_dir()).await
    }

    /// Run `script` with an explicit working directory.
    pub async fn run_in(&self, script: &TestScript, working_dir: &Path) -> TestResult {
        let mut command = Command::new(&script.path);
        command
            .current_dir(working_dir)
            .env(TIMEOUT_ENV, self.timeout.as_secs().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::debug!(error = %e, "failed to spawn script");
                return ExitOutcome::SpawnFailed(e.to_string()).into_result(&script.name, None);
            }
        };
        tracing::debug!(pid = child.id(), "spawned script");

        // Verbose streams live; otherwise stdout and stderr interleave into one buffer
        let capture = (!self.verbose).then(CaptureBuffer::default);
        let (out, err) = match &capture {
            Some(buffer) => (Sink::new(buffer.clone()), Sink::new(buffer.clone())),
            None => (self.sinks.out.clone(), self.sinks.err.clone()),
        };

        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(tokio::spawn(pump(stdout, out)));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(tokio::spawn(pump(stderr, err.clone())));
        }

        let (exit, timed_out) = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => (ExitOutcome::from_status(status), false),
            Ok(Err(e)) => (ExitOutcome::SpawnFailed(e.to_string()), false),
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "script timed out, killing it");
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "failed to kill timed out script");
                }
                (ExitOutcome::Unknown, true)
            }
        };

        drain(pumps).await;

        if timed_out {
            let mut marker = err;
            if let Err(e) = writeln!(marker, "{}", timeout_marker(self.timeout)) {
                tracing::warn!(error = %e, "failed to write timeout marker");
            }
        }

        exit.into_result(&script.name, capture.map(|buffer| buffer.contents()))
    }
}

impl TestExecutor for ProcessRunner {
    fn execute(&self, script: &TestScript) -> impl Future<Output = TestResult> + Send {
        self.run_script(script)
    }
}

/// Line appended to the output of a script killed for running too long.
pub fn timeout_marker(timeout: Duration) -> String {
    format!("Killed by testbrain: Timed out after {timeout:?}")
}

async fn pump<R>(mut reader: R, mut sink: Sink) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        sink.write_all(&buf[..n])?;
        sink.flush()?;
    }
}

async fn drain(pumps: Vec<JoinHandle<io::Result<()>>>) {
    let deadline = Instant::now() + PUMP_GRACE;
    for mut pump in pumps {
        match tokio::time::timeout_at(deadline, &mut pump).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::warn!(error = %e, "failed to forward script output"),
            Ok(Err(e)) => tracing::warn!(error = %e, "output pump task failed"),
            Err(_) => {
                tracing::warn!("script output still open after exit; a child process may have outlived it");
                pump.abort();
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::runner::results::{TestOutcome, UNKNOWN_EXIT_CODE};

    #[test]
    fn test_timeout_marker_formatting() {
        assert_eq!(timeout_marker(Duration::from_secs(1)), "Killed by testbrain: Timed out after 1s");
        assert_eq!(timeout_marker(Duration::from_secs(300)), "Killed by testbrain: Timed out after 300s");
        assert_eq!(
            timeout_marker(Duration::from_millis(1500)),
            "Killed by testbrain: Timed out after 1.5s"
        );
    }

    #[test]
    fn test_exit_outcome_into_result() {
        let passed = ExitOutcome::Exited(0).into_result("a_test.sh", Some("ok\n".to_string()));
        assert_eq!(passed.outcome, TestOutcome::Passed);
        assert_eq!(passed.output.as_deref(), Some("ok\n"));

        let failed = ExitOutcome::Exited(3).into_result("b_test.sh", None);
        assert_eq!(failed.outcome, TestOutcome::Failed);
        assert_eq!(failed.exit_code, 3);

        let skipped = ExitOutcome::Exited(99).into_result("s_test.sh", None);
        assert_eq!(skipped.outcome, TestOutcome::Skipped);

        let killed = ExitOutcome::Unknown.into_result("k_test.sh", None);
        assert_eq!(killed.outcome, TestOutcome::Failed);
        assert_eq!(killed.exit_code, UNKNOWN_EXIT_CODE);
    }

    #[cfg(unix)]
    #[test]
    fn test_decode_unix_statuses() {
        use std::os::unix::process::ExitStatusExt;

        // Raw wait statuses: exit code in the high byte, signal number in the low bits
        assert_eq!(ExitOutcome::from_status(ExitStatus::from_raw(0)), ExitOutcome::Exited(0));
        assert_eq!(ExitOutcome::from_status(ExitStatus::from_raw(42 << 8)), ExitOutcome::Exited(42));
        assert_eq!(ExitOutcome::from_status(ExitStatus::from_raw(9)), ExitOutcome::Unknown);
    }

    #[tokio::test]
    async fn test_missing_script_is_errored() {
        let runner = ProcessRunner::new(Duration::from_secs(5), false, OutputSinks::null());
        let script = TestScript {
            name: "missing_test.sh".to_string(),
            path: PathBuf::from("/nonexistent/testbrain/missing_test.sh"),
        };
        let result = runner.execute(&script).await;
        assert_eq!(result.outcome, TestOutcome::Errored);
        assert_eq!(result.exit_code, UNKNOWN_EXIT_CODE);
        assert!(!result.output.unwrap_or_default().is_empty());
    }
}
