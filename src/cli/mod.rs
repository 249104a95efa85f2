//! CLI module for testbrain
//!
//! This module provides the command-line interface. It only turns flags into a
//! [`RunOptions`](crate::runner::RunOptions) value and maps the engine's outcome to an exit code.
//!
//! ## Commands
//!
//! - `run [PATH]...` - Discover, order and run test scripts
//! - `version` - Print the testbrain version
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use crate::runner::options::{DEFAULT_EXCLUDE, DEFAULT_INCLUDE};
use crate::version::TESTBRAIN_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    /// At least one test failed
    pub const FAILURE: ExitCode = ExitCode(1);
    /// Configuration or discovery error; no test ran
    pub const USAGE: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Acceptance test brain
#[derive(Parser, Debug)]
#[command(name = "testbrain")]
#[command(version = TESTBRAIN_VERSION)]
#[command(about = "Discovers, orders and runs acceptance test scripts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run all tests below the given paths
    Run(RunArgs),

    /// Display testbrain's version
    Version,
}

/// Flags of the `run` command
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    /// Test scripts or directories to search (default: current directory)
    #[arg(value_name = "PATH")]
    pub targets: Vec<PathBuf>,

    /// Timeout in seconds for each individual test
    #[arg(long, value_name = "SECS", default_value_t = 300, env = "TESTBRAIN_TIMEOUT",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Stream the output of running tests
    #[arg(short, long)]
    pub verbose: bool,

    /// Regex of files to run when walking directories
    #[arg(long, value_name = "REGEX", default_value = DEFAULT_INCLUDE, env = "TESTBRAIN_INCLUDE")]
    pub include: String,

    /// Regex of files to skip
    #[arg(long, value_name = "REGEX", default_value = DEFAULT_EXCLUDE, env = "TESTBRAIN_EXCLUDE")]
    pub exclude: String,

    /// Run tests in lexicographic order instead of shuffling
    #[arg(long)]
    pub in_order: bool,

    /// Seed for the shuffle (default: derived from the clock)
    #[arg(long, value_name = "INT", allow_negative_numbers = true, env = "TESTBRAIN_SEED")]
    pub seed: Option<i64>,

    /// List the tests that would run without running them
    #[arg(long)]
    pub dry_run: bool,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Run(args) => commands::run_tests(args),
        Command::Version => commands::print_version(),
    }
}

// ============================================================================
// Tests
// ============================================================================
