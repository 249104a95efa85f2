//! testbrain version information.
//!
//! This module exposes the version as a single constant so the CLI `version` command and `--version` flag agree on
//! the same value.
//!
//! ## Notes
//!
//! - The value is taken from Cargo metadata (`CARGO_PKG_VERSION`) at compile time.
//! - Prefer this constant over repeating `env!("CARGO_PKG_VERSION")` in multiple places.

/// The testbrain version string (for example, `0.3.0`).
pub const TESTBRAIN_VERSION: &str = env!("CARGO_PKG_VERSION");
