//! Reporting run progress and results
//!
//! ## TestReporter Trait
//!
//! The engine drives a [`TestReporter`] through the run's phases and never formats output itself. Two reporters ship:
//!
//! - [`ConsoleReporter`]: human-readable text, optionally coloured with ANSI escapes
//! - [`JsonReporter`]: a single JSON document at the end of the run, never coloured
//!
//! Reporters write to injected [`Sink`]s, so tests can capture everything they print.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use super::TestPlan;
use super::discovery::TestScript;
use super::results::{RunSummary, TestOutcome, TestResult};
use super::sink::{OutputSinks, Sink};

// ============================================================================
// Test Reporter Trait
// ============================================================================

/// Trait for reporting test run progress and results.
pub trait TestReporter {
    /// Called once scripts are discovered and ordered
    fn on_collection_complete(&mut self, plan: &TestPlan) -> io::Result<()>;

    /// Called instead of running anything when the run is a dry run
    fn on_dry_run(&mut self, plan: &TestPlan) -> io::Result<()>;

    /// Called before a script starts; `index` is 1-based
    fn on_test_start(&mut self, _index: usize, _total: usize, _script: &TestScript) -> io::Result<()> {
        Ok(())
    }

    /// Called when a script has finished
    fn on_test_complete(&mut self, _result: &TestResult) -> io::Result<()> {
        Ok(())
    }

    /// Called once with the aggregated results
    fn on_run_complete(&mut self, summary: &RunSummary) -> io::Result<()>;
}

// ============================================================================
// Colours
// ============================================================================

const GREEN: &str = "\x1b[32m";
const GREEN_BOLD: &str = "\x1b[1;32m";
const RED: &str = "\x1b[31m";
const RED_BOLD: &str = "\x1b[1;31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// ANSI colouring that can be switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Palette {
    pub enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn paint(&self, style: &str, text: &str) -> String {
        if self.enabled {
            format!("{style}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

// ============================================================================
// Console reporter
// ============================================================================

/// Human-readable text reporter
#[derive(Debug)]
pub struct ConsoleReporter {
    sinks: OutputSinks,
    verbose: bool,
    palette: Palette,
}

impl ConsoleReporter {
    pub fn new(sinks: OutputSinks, verbose: bool, palette: Palette) -> Self {
        Self { sinks, verbose, palette }
    }

    fn verdict(&self, result: &TestResult) -> String {
        match result.outcome {
            TestOutcome::Passed => self.palette.paint(GREEN, "PASSED"),
            TestOutcome::Skipped => self.palette.paint(YELLOW, "SKIPPED"),
            TestOutcome::Failed | TestOutcome::Errored => self.palette.paint(RED_BOLD, "FAILED"),
        }
    }
}

impl TestReporter for ConsoleReporter {
    fn on_collection_complete(&mut self, plan: &TestPlan) -> io::Result<()> {
        let out = &mut self.sinks.out;
        writeln!(out, "Found {} test files", plan.scripts.len())?;
        if !plan.ordering.is_in_order() {
            writeln!(out, "Using seed: {}", plan.ordering.reported_seed())?;
        }
        Ok(())
    }

    fn on_dry_run(&mut self, plan: &TestPlan) -> io::Result<()> {
        let out = &mut self.sinks.out;
        writeln!(out, "Test root: {}", plan.root.display())?;
        writeln!(out, "Test files:")?;
        for script in &plan.scripts {
            writeln!(out, "\t{}", script.name)?;
        }
        out.flush()
    }

    fn on_test_start(&mut self, index: usize, total: usize, script: &TestScript) -> io::Result<()> {
        if self.verbose {
            writeln!(self.sinks.out, "Running test {} ({}/{})", script.name, index, total)?;
            self.sinks.out.flush()?;
        }
        Ok(())
    }

    fn on_test_complete(&mut self, result: &TestResult) -> io::Result<()> {
        if !self.verbose {
            return Ok(());
        }
        // Nothing was streamed for a script that never started, so show why here
        if result.outcome == TestOutcome::Errored {
            if let Some(message) = &result.output {
                writeln!(self.sinks.err, "{}", self.palette.paint(RED, message))?;
            }
        }
        let verdict = self.verdict(result);
        writeln!(self.sinks.out, "{}: {}\n", verdict, result.name)?;
        self.sinks.out.flush()
    }

    fn on_run_complete(&mut self, summary: &RunSummary) -> io::Result<()> {
        let line = format!(
            "Tests complete: {} Passed, {} Skipped, {} Failed",
            summary.passed_count(),
            summary.skipped_count(),
            summary.failed_count()
        );
        let style = if summary.is_success() { GREEN_BOLD } else { RED_BOLD };
        let out = &mut self.sinks.out;
        writeln!(out, "{}\n", self.palette.paint(style, &line))?;

        if !summary.skipped.is_empty() {
            writeln!(out, "  Skipped tests:")?;
            for result in &summary.skipped {
                writeln!(out, "    {}", self.palette.paint(YELLOW, &result.name))?;
            }
            writeln!(out)?;
        }

        if !summary.failed.is_empty() {
            writeln!(out, "  Failed tests:")?;
            for result in &summary.failed {
                let entry = format!("{} with exit code {}", result.name, result.exit_code);
                writeln!(out, "    {}", self.palette.paint(RED, &entry))?;
            }
            writeln!(out)?;

            if !self.verbose {
                for result in &summary.failed {
                    let Some(output) = result.output.as_deref().filter(|o| !o.is_empty()) else {
                        continue;
                    };
                    writeln!(out, "{}", self.palette.paint(RED_BOLD, &format!("Output of {}:", result.name)))?;
                    out.write_all(output.as_bytes())?;
                    if !output.ends_with('\n') {
                        writeln!(out)?;
                    }
                    writeln!(out)?;
                }
            }
        }

        if !summary.in_order() {
            writeln!(out, "Seed used: {}", summary.seed())?;
        }
        out.flush()
    }
}

// ============================================================================
// JSON reporter
// ============================================================================

/// A passed or skipped test in the JSON report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonTest {
    pub filename: String,
}

/// A failed test in the JSON report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonFailure {
    pub filename: String,
    pub exitcode: i32,
}

/// The JSON document emitted at the end of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReport {
    pub passed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub seed: i64,
    pub in_order: bool,
    pub passed_list: Vec<JsonTest>,
    pub skipped_list: Vec<JsonTest>,
    pub failed_list: Vec<JsonFailure>,
}

impl From<&RunSummary> for JsonReport {
    fn from(summary: &RunSummary) -> Self {
        Self {
            passed: summary.passed_count(),
            skipped: summary.skipped_count(),
            failed: summary.failed_count(),
            seed: summary.seed(),
            in_order: summary.in_order(),
            passed_list: json_tests(&summary.passed),
            skipped_list: json_tests(&summary.skipped),
            failed_list: summary
                .failed
                .iter()
                .map(|r| JsonFailure {
                    filename: r.name.clone(),
                    exitcode: r.exit_code,
                })
                .collect(),
        }
    }
}

fn json_tests(results: &[TestResult]) -> Vec<JsonTest> {
    results
        .iter()
        .map(|r| JsonTest {
            filename: r.name.clone(),
        })
        .collect()
}

/// The JSON document emitted by a dry run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonDryRun {
    pub root: String,
    pub seed: i64,
    pub in_order: bool,
    pub tests: Vec<String>,
}

impl From<&TestPlan> for JsonDryRun {
    fn from(plan: &TestPlan) -> Self {
        Self {
            root: plan.root.to_string_lossy().into_owned(),
            seed: plan.ordering.reported_seed(),
            in_order: plan.ordering.is_in_order(),
            tests: plan.scripts.iter().map(|s| s.name.clone()).collect(),
        }
    }
}

/// Machine-readable reporter: one JSON document per run, nothing else.
#[derive(Debug)]
pub struct JsonReporter {
    out: Sink,
}

impl JsonReporter {
    pub fn new(out: Sink) -> Self {
        Self { out }
    }

    fn emit<T: Serialize>(&mut self, document: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, document)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

impl TestReporter for JsonReporter {
    fn on_collection_complete(&mut self, _plan: &TestPlan) -> io::Result<()> {
        Ok(())
    }

    fn on_dry_run(&mut self, plan: &TestPlan) -> io::Result<()> {
        self.emit(&JsonDryRun::from(plan))
    }

    fn on_run_complete(&mut self, summary: &RunSummary) -> io::Result<()> {
        self.emit(&JsonReport::from(summary))
    }
}
