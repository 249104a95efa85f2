#![forbid(unsafe_code)]
//! testbrain: an acceptance test brain
//!
//! testbrain discovers executable test scripts below a set of targets, orders them (lexicographically or with a
//! reproducible seeded shuffle), runs each one as a child process under a wall-clock timeout, and reports the
//! passed/skipped/failed results as text or JSON.
//!
//! The engine lives in [`runner`]; [`cli`] is the thin clap front end that builds a [`runner::RunOptions`] and hands
//! it to the engine.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `runner` modules
//!   enforce `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Per-test failures are data**: a script that cannot be spawned, times out or dies from a signal is recorded as a
//!   [`runner::TestResult`]. Only configuration and discovery problems abort a run.

pub mod cli;
pub mod runner;
pub mod version;

pub use runner::{
    OutputSinks, RunError, RunOptions, RunOutcome, RunSummary, Runner, Sink, TestOutcome, TestResult, TestScript,
};
