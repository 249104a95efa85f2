//! End-to-end tests of the engine against real shell scripts
//!
//! All scripts live in one fixture directory that is written completely before any test spawns a process, so no
//! script is ever executed while another thread still holds it open for writing.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use tempfile::TempDir;
use testbrain::runner::{
    CaptureBuffer, JsonReport, OutputSinks, ProcessRunner, RunOptions, RunOutcome, RunSummary, Runner, Sink,
    TestOutcome, TestScript, UNKNOWN_EXIT_CODE,
};

const SCRIPTS: &[(&str, &str, bool)] = &[
    ("scenario/a_test.sh", "echo ok\nexit 0\n", true),
    ("scenario/b_test.sh", "exit 3\n", true),
    ("scenario/c_test.sh", "echo started\nexec sleep 60\n", true),
    ("mixed/success_test.sh", "echo 'Hello World!'\n", true),
    ("mixed/fail_test.sh", "echo 'Goodbye World!'\nexit 42\n", true),
    (
        "mixed/skip_test.sh",
        "echo 'Something stdout'\necho 'Something stderr' >&2\nexit 99\n",
        true,
    ),
    ("env/env_test.sh", "echo \"Timeout = $TESTBRAIN_TIMEOUT\"\npwd -P\n", true),
    ("signal/signal_test.sh", "kill -9 $$\n", true),
    ("noexec/plain_test.sh", "exit 0\n", false),
];

fn fixture() -> &'static Path {
    static FIXTURE: OnceLock<TempDir> = OnceLock::new();
    FIXTURE
        .get_or_init(|| {
            let dir = tempfile::tempdir().unwrap();
            for (name, body, executable) in SCRIPTS {
                let path = dir.path().join(name);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
                let mode = if *executable { 0o755 } else { 0o644 };
                fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
            }
            dir
        })
        .path()
}

fn script(name: &str) -> TestScript {
    let path = fixture().join(name);
    TestScript {
        name: Path::new(name).file_name().unwrap().to_string_lossy().into_owned(),
        path,
    }
}

fn capture_sinks() -> (OutputSinks, CaptureBuffer, CaptureBuffer) {
    let (out, out_buf) = Sink::capture();
    let (err, err_buf) = Sink::capture();
    (OutputSinks::new(out, err), out_buf, err_buf)
}

async fn completed(runner: &Runner) -> RunSummary {
    match runner.run().await.unwrap() {
        RunOutcome::Completed(summary) => summary,
        RunOutcome::DryRun(_) => panic!("Expected a completed run"),
    }
}

// ============================================================================
// Single scripts
// ============================================================================

#[tokio::test]
async fn test_passing_script_captures_output() {
    let runner = ProcessRunner::new(Duration::from_secs(30), false, OutputSinks::null());
    let result = runner.run_script(&script("mixed/success_test.sh")).await;
    assert_eq!(result.outcome, TestOutcome::Passed);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.output.as_deref(), Some("Hello World!\n"));
}

#[tokio::test]
async fn test_failing_script_keeps_exit_code() {
    let runner = ProcessRunner::new(Duration::from_secs(30), false, OutputSinks::null());
    let result = runner.run_script(&script("mixed/fail_test.sh")).await;
    assert_eq!(result.outcome, TestOutcome::Failed);
    assert_eq!(result.exit_code, 42);
    assert_eq!(result.output.as_deref(), Some("Goodbye World!\n"));
}

#[tokio::test]
async fn test_skip_code_is_skipped() {
    let runner = ProcessRunner::new(Duration::from_secs(30), false, OutputSinks::null());
    let result = runner.run_script(&script("mixed/skip_test.sh")).await;
    assert_eq!(result.outcome, TestOutcome::Skipped);
    assert_eq!(result.exit_code, 99);
    let output = result.output.unwrap();
    assert!(output.contains("Something stdout\n"));
    assert!(output.contains("Something stderr\n"));
}

#[tokio::test]
async fn test_timeout_kills_and_marks_output() {
    let runner = ProcessRunner::new(Duration::from_secs(1), false, OutputSinks::null());
    let result = runner.run_script(&script("scenario/c_test.sh")).await;
    assert_eq!(result.outcome, TestOutcome::Failed);
    assert_eq!(result.exit_code, UNKNOWN_EXIT_CODE);
    assert_eq!(
        result.output.as_deref(),
        Some("started\nKilled by testbrain: Timed out after 1s\n")
    );
}

#[tokio::test]
async fn test_timeout_marker_goes_to_err_sink_when_verbose() {
    let (sinks, out, err) = capture_sinks();
    let runner = ProcessRunner::new(Duration::from_secs(1), true, sinks);
    let result = runner.run_script(&script("scenario/c_test.sh")).await;
    assert_eq!(result.exit_code, UNKNOWN_EXIT_CODE);
    assert!(result.output.is_none());
    assert_eq!(out.contents(), "started\n");
    assert_eq!(err.contents(), "Killed by testbrain: Timed out after 1s\n");
}

#[tokio::test]
async fn test_verbose_streams_instead_of_capturing() {
    let (sinks, out, err) = capture_sinks();
    let runner = ProcessRunner::new(Duration::from_secs(30), true, sinks);
    let result = runner.run_script(&script("mixed/skip_test.sh")).await;
    assert_eq!(result.outcome, TestOutcome::Skipped);
    assert!(result.output.is_none());
    assert_eq!(out.contents(), "Something stdout\n");
    assert_eq!(err.contents(), "Something stderr\n");
}

#[tokio::test]
async fn test_environment_and_working_directory() {
    let runner = ProcessRunner::new(Duration::from_secs(7), false, OutputSinks::null());
    let result = runner.run_script(&script("env/env_test.sh")).await;
    let expected_dir = fs::canonicalize(fixture().join("env")).unwrap();
    assert_eq!(
        result.output.as_deref(),
        Some(format!("Timeout = 7\n{}\n", expected_dir.display()).as_str())
    );
}

#[tokio::test]
async fn test_signal_death_is_unknown_exit() {
    let runner = ProcessRunner::new(Duration::from_secs(30), false, OutputSinks::null());
    let result = runner.run_script(&script("signal/signal_test.sh")).await;
    assert_eq!(result.outcome, TestOutcome::Failed);
    assert_eq!(result.exit_code, UNKNOWN_EXIT_CODE);
}

#[tokio::test]
async fn test_non_executable_script_is_errored() {
    let runner = ProcessRunner::new(Duration::from_secs(30), false, OutputSinks::null());
    let result = runner.run_script(&script("noexec/plain_test.sh")).await;
    assert_eq!(result.outcome, TestOutcome::Errored);
    assert_eq!(result.exit_code, UNKNOWN_EXIT_CODE);
    assert!(!result.output.unwrap().is_empty());
}

// ============================================================================
// Whole runs
// ============================================================================

#[tokio::test]
async fn test_example_scenario() {
    let options = RunOptions::new()
        .with_targets([fixture().join("scenario")])
        .with_timeout(Duration::from_secs(1))
        .with_in_order(true);
    let runner = Runner::new(options, OutputSinks::null());
    let summary = completed(&runner).await;

    assert_eq!(summary.passed_count(), 1);
    assert_eq!(summary.skipped_count(), 0);
    assert_eq!(summary.failed_count(), 2);

    let a = &summary.passed[0];
    assert_eq!((a.name.as_str(), a.exit_code), ("a_test.sh", 0));
    assert_eq!(a.output.as_deref(), Some("ok\n"));

    let b = &summary.failed[0];
    assert_eq!((b.name.as_str(), b.exit_code), ("b_test.sh", 3));

    let c = &summary.failed[1];
    assert_eq!((c.name.as_str(), c.exit_code), ("c_test.sh", UNKNOWN_EXIT_CODE));
    assert!(c.output.as_deref().unwrap().contains("Timed out"));
}

#[tokio::test]
async fn test_text_report_non_verbose() {
    let options = RunOptions::new().with_targets([fixture().join("mixed")]).with_in_order(true);
    let (sinks, out, err) = capture_sinks();
    let runner = Runner::new(options, sinks);
    let summary = completed(&runner).await;
    assert!(!summary.is_success());

    assert_eq!(
        out.contents(),
        "Found 3 test files\n\
         Tests complete: 1 Passed, 1 Skipped, 1 Failed\n\n\
         \x20 Skipped tests:\n\
         \x20   skip_test.sh\n\n\
         \x20 Failed tests:\n\
         \x20   fail_test.sh with exit code 42\n\n\
         Output of fail_test.sh:\n\
         Goodbye World!\n\n"
    );
    assert_eq!(err.contents(), "");
}

#[tokio::test]
async fn test_text_report_verbose() {
    let options = RunOptions::new()
        .with_targets([fixture().join("mixed")])
        .with_in_order(true)
        .with_verbose(true);
    let (sinks, out, err) = capture_sinks();
    let runner = Runner::new(options, sinks);
    completed(&runner).await;

    assert_eq!(
        out.contents(),
        "Found 3 test files\n\
         Running test fail_test.sh (1/3)\n\
         Goodbye World!\n\
         FAILED: fail_test.sh\n\n\
         Running test skip_test.sh (2/3)\n\
         Something stdout\n\
         SKIPPED: skip_test.sh\n\n\
         Running test success_test.sh (3/3)\n\
         Hello World!\n\
         PASSED: success_test.sh\n\n\
         Tests complete: 1 Passed, 1 Skipped, 1 Failed\n\n\
         \x20 Skipped tests:\n\
         \x20   skip_test.sh\n\n\
         \x20 Failed tests:\n\
         \x20   fail_test.sh with exit code 42\n\n"
    );
    assert_eq!(err.contents(), "Something stderr\n");
}

#[tokio::test]
async fn test_json_report_with_seed() {
    let seed = 1552072438299530183;
    let options = RunOptions::new()
        .with_targets([fixture().join("mixed")])
        .with_seed(seed)
        .with_json(true);
    let (sinks, out, _) = capture_sinks();
    let runner = Runner::new(options, sinks);
    let summary = completed(&runner).await;

    let report: JsonReport = serde_json::from_str(&out.contents()).unwrap();
    assert_eq!(report, JsonReport::from(&summary));
    assert_eq!(report.seed, seed);
    assert!(!report.in_order);
    assert_eq!((report.passed, report.skipped, report.failed), (1, 1, 1));
    assert_eq!(report.failed_list[0].filename, "fail_test.sh");
    assert_eq!(report.failed_list[0].exitcode, 42);
}

#[tokio::test]
async fn test_json_report_stays_clean_when_verbose() {
    let options = RunOptions::new()
        .with_targets([fixture().join("mixed")])
        .with_in_order(true)
        .with_json(true)
        .with_verbose(true);
    let (sinks, out, err) = capture_sinks();
    let runner = Runner::new(options, sinks);
    let summary = completed(&runner).await;

    let contents = out.contents();
    assert_eq!(contents.lines().count(), 1);
    let report: JsonReport = serde_json::from_str(&contents).unwrap();
    assert_eq!(report, JsonReport::from(&summary));
    assert_eq!(err.contents(), "");

    // Output was captured instead of streamed
    let failed = &summary.failed[0];
    assert_eq!(failed.output.as_deref(), Some("Goodbye World!\n"));
}

#[tokio::test]
async fn test_counts_cover_every_discovered_script() {
    let targets: Vec<PathBuf> = ["mixed", "signal", "noexec"].iter().map(|d| fixture().join(d)).collect();
    let options = RunOptions::new().with_targets(targets).with_seed(3);
    let runner = Runner::new(options, OutputSinks::null());
    let plan = runner.plan().unwrap();
    let summary = completed(&runner).await;

    assert_eq!(summary.total(), plan.scripts.len());
    assert_eq!(summary.total(), 5);
    assert_eq!(plan.root, fixture());
    assert_eq!(summary.failed_count(), 3);
}
