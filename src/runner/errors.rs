//! Fatal errors of a test run
//!
//! Only configuration and discovery problems abort a run. Everything that goes wrong while a single script runs
//! (spawn failure, timeout, death by signal) is recorded as a [`TestResult`](super::TestResult) instead.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Which of the two path filters a pattern belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Include,
    Exclude,
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterKind::Include => f.write_str("include"),
            FilterKind::Exclude => f.write_str("exclude"),
        }
    }
}

/// Invalid run configuration. Raised before any test runs.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid {kind} pattern `{pattern}`")]
    #[diagnostic(
        code(testbrain::config::pattern),
        help("patterns use Rust regex syntax and are matched against absolute file paths")
    )]
    Pattern {
        kind: FilterKind,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("an explicit seed cannot be combined with in-order execution")]
    #[diagnostic(
        code(testbrain::config::ordering),
        help("drop --in-order to shuffle with the seed, or drop --seed to run in lexicographic order")
    )]
    ConflictingOrdering,
}

/// A target could not be read or walked. Raised before any test runs.
#[derive(Debug, Error, Diagnostic)]
pub enum DiscoveryError {
    #[error("could not read test target {}", .path.display())]
    #[diagnostic(code(testbrain::discovery::target), help("check that the path exists and is readable"))]
    Target {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to walk {}", .path.display())]
    #[diagnostic(code(testbrain::discovery::walk))]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("{} is not below the test root {}", .path.display(), .root.display())]
    #[diagnostic(code(testbrain::discovery::root))]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

/// Any error that aborts a whole run.
#[derive(Debug, Error, Diagnostic)]
pub enum RunError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("failed to write test report")]
    #[diagnostic(code(testbrain::output))]
    Output(#[from] io::Error),
}

impl RunError {
    /// Configuration and discovery errors are the caller's fault; output errors are environmental.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, RunError::Config(_) | RunError::Discovery(_))
    }
}
