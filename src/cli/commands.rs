//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::io::IsTerminal;
use std::time::Duration;

use crate::runner::{OutputSinks, RunError, RunOptions, Runner};
use crate::version::TESTBRAIN_VERSION;

use super::{CliError, CliResult, ExitCode, RunArgs};

impl From<RunArgs> for RunOptions {
    fn from(args: RunArgs) -> Self {
        let mut options = RunOptions::new()
            .with_targets(args.targets)
            .with_include(args.include)
            .with_exclude(args.exclude)
            .with_timeout(Duration::from_secs(args.timeout))
            .with_in_order(args.in_order)
            .with_json(args.json)
            .with_verbose(args.verbose)
            .with_dry_run(args.dry_run);
        options.seed = args.seed;
        options
    }
}

/// Run the tests selected by `args` and map the outcome to an exit code.
pub fn run_tests(args: RunArgs) -> CliResult<ExitCode> {
    let options = RunOptions::from(args);
    let color = !options.json && std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    let runner = Runner::new(options, OutputSinks::standard()).with_color(color);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::failure(format!("Error starting async runtime: {e}")))?;

    match runtime.block_on(runner.run()) {
        Ok(outcome) if outcome.is_success() => Ok(ExitCode::SUCCESS),
        Ok(_) => {
            // Summary already printed; only the exit code is left to report
            tracing::debug!("tests failed");
            Err(CliError::new("", ExitCode::FAILURE))
        }
        Err(e) => Err(render_run_error(e)),
    }
}

/// Print the version.
pub fn print_version() -> CliResult<ExitCode> {
    println!("{}", TESTBRAIN_VERSION);
    Ok(ExitCode::SUCCESS)
}

fn render_run_error(err: RunError) -> CliError {
    let exit_code = if err.is_usage_error() { ExitCode::USAGE } else { ExitCode::FAILURE };
    let report = miette::Report::new(err);
    CliError::new(format!("{report:?}"), exit_code)
}
