//! Per-test results and their aggregation

use super::ordering::Ordering;

/// Exit code recorded when the real one is unknown (timeout, signal, spawn failure).
pub const UNKNOWN_EXIT_CODE: i32 = -1;
/// Exit code a script returns to be reported as skipped.
pub const SKIP_EXIT_CODE: i32 = 99;

/// Outcome of a single test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Skipped,
    Failed,
    /// The script could not be started or waited on
    Errored,
}

impl TestOutcome {
    /// Classify a decoded exit code.
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => TestOutcome::Passed,
            SKIP_EXIT_CODE => TestOutcome::Skipped,
            _ => TestOutcome::Failed,
        }
    }

    /// Failed and errored tests both count as failures.
    pub fn is_failure(self) -> bool {
        matches!(self, TestOutcome::Failed | TestOutcome::Errored)
    }
}

/// Result of running one script. Created once by the executor and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    /// Relative name of the script
    pub name: String,
    pub outcome: TestOutcome,
    /// Decoded exit code or [`UNKNOWN_EXIT_CODE`]
    pub exit_code: i32,
    /// Captured stdout and stderr; `None` when output was streamed live
    pub output: Option<String>,
}

impl TestResult {
    /// Result of a script that ran to completion with a numeric exit code.
    pub fn exited(name: impl Into<String>, exit_code: i32, output: Option<String>) -> Self {
        Self {
            name: name.into(),
            outcome: TestOutcome::from_exit_code(exit_code),
            exit_code,
            output,
        }
    }

    /// Result of a script that ended without a usable exit code (timeout, signal).
    pub fn unknown_exit(name: impl Into<String>, output: Option<String>) -> Self {
        Self {
            name: name.into(),
            outcome: TestOutcome::Failed,
            exit_code: UNKNOWN_EXIT_CODE,
            output,
        }
    }

    /// Result of a script that could not be run at all; the OS error becomes the output.
    pub fn errored(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: TestOutcome::Errored,
            exit_code: UNKNOWN_EXIT_CODE,
            output: Some(message.into()),
        }
    }
}

/// Aggregated results of a run, partitioned by outcome in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub ordering: Ordering,
    pub passed: Vec<TestResult>,
    pub skipped: Vec<TestResult>,
    /// Failed and errored results
    pub failed: Vec<TestResult>,
}

impl RunSummary {
    pub fn passed_count(&self) -> usize {
        self.passed.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn total(&self) -> usize {
        self.passed.len() + self.skipped.len() + self.failed.len()
    }

    /// Seed that produced the order, or -1 when not shuffled.
    pub fn seed(&self) -> i64 {
        self.ordering.reported_seed()
    }

    pub fn in_order(&self) -> bool {
        self.ordering.is_in_order()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Partition results by outcome, keeping execution order within each bucket.
pub fn aggregate(results: Vec<TestResult>, ordering: Ordering) -> RunSummary {
    let mut summary = RunSummary {
        ordering,
        passed: Vec::new(),
        skipped: Vec::new(),
        failed: Vec::new(),
    };
    for result in results {
        let bucket = if result.outcome.is_failure() {
            &mut summary.failed
        } else if result.outcome == TestOutcome::Skipped {
            &mut summary.skipped
        } else {
            &mut summary.passed
        };
        bucket.push(result);
    }
    summary
}
