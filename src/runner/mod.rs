//! Test-run engine
//!
//! A run moves through fixed phases:
//!
//! ```text
//! Configured -> Discovering -> Ordering -> Reporting (dry run)
//!                                       -> Executing[1..n] -> Aggregating -> Reporting
//! ```
//!
//! Configuration and discovery failures end the run with a [`RunError`]. Failures of individual scripts are recorded
//! in their [`TestResult`] and never stop the remaining scripts. Scripts run strictly one after another.
//!
//! ## Modules
//!
//! - `options` - [`RunOptions`] and compiled path filters
//! - `discovery` - target walking, filtering and common-root computation
//! - `ordering` - lexicographic order and the seeded shuffle
//! - `executor` - spawning one script under a timeout
//! - `results` - per-test results and aggregation
//! - `reporter` - text and JSON reporting
//! - `sink` - injected output destinations

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod discovery;
pub mod errors;
pub mod executor;
pub mod options;
pub mod ordering;
pub mod reporter;
pub mod results;
pub mod sink;

use std::path::PathBuf;

pub use discovery::{Discovery, TestScript, common_path_prefix};
pub use errors::{ConfigError, DiscoveryError, FilterKind, RunError};
pub use executor::{ExitOutcome, ProcessRunner, TIMEOUT_ENV, TestExecutor};
pub use options::{Filters, RunOptions};
pub use ordering::{NO_SEED, Ordering};
pub use reporter::{ConsoleReporter, JsonReport, JsonReporter, Palette, TestReporter};
pub use results::{RunSummary, SKIP_EXIT_CODE, TestOutcome, TestResult, UNKNOWN_EXIT_CODE, aggregate};
pub use sink::{CaptureBuffer, OutputSinks, Sink};

/// Scripts in execution order, with the root their names are relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPlan {
    pub root: PathBuf,
    pub scripts: Vec<TestScript>,
    pub ordering: Ordering,
}

/// How a run ended when no fatal error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing was executed; the plan was reported
    DryRun(TestPlan),
    /// Every script ran
    Completed(RunSummary),
}

impl RunOutcome {
    /// Dry runs and runs without failures succeed.
    pub fn is_success(&self) -> bool {
        match self {
            RunOutcome::DryRun(_) => true,
            RunOutcome::Completed(summary) => summary.is_success(),
        }
    }
}

/// The test-run engine.
///
/// Owns the immutable [`RunOptions`], the injected [`OutputSinks`], and the [`TestExecutor`] used for each script.
pub struct Runner<E = ProcessRunner> {
    options: RunOptions,
    sinks: OutputSinks,
    executor: E,
    palette: Palette,
}

impl Runner<ProcessRunner> {
    /// Engine that runs scripts as child processes.
    ///
    /// Script output is only streamed live for verbose text runs. A JSON run always captures it, so stdout carries
    /// nothing but the one report document.
    pub fn new(options: RunOptions, sinks: OutputSinks) -> Self {
        let stream_live = options.verbose && !options.json;
        let executor = ProcessRunner::new(options.timeout, stream_live, sinks.clone());
        Self::with_executor(options, sinks, executor)
    }
}

impl<E: TestExecutor> Runner<E> {
    pub fn with_executor(options: RunOptions, sinks: OutputSinks, executor: E) -> Self {
        Self {
            options,
            sinks,
            executor,
            palette: Palette::default(),
        }
    }

    /// Colour text output. JSON output is never coloured.
    pub fn with_color(mut self, enabled: bool) -> Self {
        self.palette = Palette::new(enabled);
        self
    }

    /// Validate, discover and order, without running anything.
    pub fn plan(&self) -> Result<TestPlan, RunError> {
        let filters = self.options.validate()?;
        let Discovery { root, mut scripts } = discovery::discover(&self.options.effective_targets(), &filters)?;
        let ordering = Ordering::resolve(self.options.in_order, self.options.seed);
        ordering.apply(&mut scripts);
        Ok(TestPlan {
            root,
            scripts,
            ordering,
        })
    }

    /// Perform the whole run and report it.
    #[tracing::instrument(skip_all, fields(json = self.options.json, dry_run = self.options.dry_run))]
    pub async fn run(&self) -> Result<RunOutcome, RunError> {
        let plan = self.plan()?;
        let mut reporter = self.reporter();

        reporter.on_collection_complete(&plan)?;
        if self.options.dry_run {
            reporter.on_dry_run(&plan)?;
            return Ok(RunOutcome::DryRun(plan));
        }

        let results = self.execute_all(&plan, reporter.as_mut()).await?;
        let summary = aggregate(results, plan.ordering);
        tracing::debug!(
            passed = summary.passed_count(),
            skipped = summary.skipped_count(),
            failed = summary.failed_count(),
            "run complete"
        );
        reporter.on_run_complete(&summary)?;
        Ok(RunOutcome::Completed(summary))
    }

    async fn execute_all(&self, plan: &TestPlan, reporter: &mut dyn TestReporter) -> Result<Vec<TestResult>, RunError> {
        let total = plan.scripts.len();
        let mut results = Vec::with_capacity(total);
        for (i, script) in plan.scripts.iter().enumerate() {
            reporter.on_test_start(i + 1, total, script)?;
            let result = self.executor.execute(script).await;
            tracing::debug!(script = %result.name, outcome = ?result.outcome, exit_code = result.exit_code, "test finished");
            reporter.on_test_complete(&result)?;
            results.push(result);
        }
        Ok(results)
    }

    fn reporter(&self) -> Box<dyn TestReporter> {
        if self.options.json {
            Box::new(JsonReporter::new(self.sinks.out.clone()))
        } else {
            Box::new(ConsoleReporter::new(self.sinks.clone(), self.options.verbose, self.palette))
        }
    }
}
