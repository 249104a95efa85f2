//! Run configuration
//!
//! [`RunOptions`] is the single immutable value the front end hands to the engine. It is validated once per run into
//! compiled [`Filters`]; nothing downstream re-reads flags or environment.

use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;

use super::errors::{ConfigError, FilterKind};

/// Default per-test timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
/// Default include pattern: shell scripts ending in `_test.sh`.
pub const DEFAULT_INCLUDE: &str = r"_test\.sh$";
/// Default exclude pattern: matches no real path.
pub const DEFAULT_EXCLUDE: &str = "^$";

/// Run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Files or directories to search. Empty means the current directory.
    pub targets: Vec<PathBuf>,
    /// Regex a walked file's absolute path must match
    pub include: String,
    /// Regex that rejects a file when its absolute path matches
    pub exclude: String,
    /// Wall-clock limit for each script
    pub timeout: Duration,
    /// Keep lexicographic order instead of shuffling
    pub in_order: bool,
    /// Shuffle seed; generated from the clock when absent
    pub seed: Option<i64>,
    /// Emit one JSON document instead of text
    pub json: bool,
    /// Stream script output live instead of capturing it
    pub verbose: bool,
    /// Only report what would run
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            include: DEFAULT_INCLUDE.to_string(),
            exclude: DEFAULT_EXCLUDE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            in_order: false,
            seed: None,
            json: false,
            verbose: false,
            dry_run: false,
        }
    }
}

impl RunOptions {
    /// Create options with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_targets<I, P>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_include(mut self, pattern: impl Into<String>) -> Self {
        self.include = pattern.into();
        self
    }

    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude = pattern.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_in_order(mut self, in_order: bool) -> Self {
        self.in_order = in_order;
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Targets to search, falling back to the current directory.
    pub fn effective_targets(&self) -> Vec<PathBuf> {
        if self.targets.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.targets.clone()
        }
    }

    /// Check the options for consistency and compile the path filters.
    pub fn validate(&self) -> Result<Filters, ConfigError> {
        if self.in_order && self.seed.is_some() {
            return Err(ConfigError::ConflictingOrdering);
        }
        Ok(Filters {
            include: compile(FilterKind::Include, &self.include)?,
            exclude: compile(FilterKind::Exclude, &self.exclude)?,
        })
    }
}

fn compile(kind: FilterKind, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::Pattern {
        kind,
        pattern: pattern.to_string(),
        source,
    })
}

/// Compiled include/exclude filters.
#[derive(Debug, Clone)]
pub struct Filters {
    pub include: Regex,
    pub exclude: Regex,
}

impl Filters {
    /// A walked file runs only when it is included and not excluded.
    pub fn accepts_walked(&self, path: &str) -> bool {
        self.include.is_match(path) && !self.exclude.is_match(path)
    }

    /// An explicitly named file bypasses the include filter; exclusion still applies.
    pub fn accepts_explicit(&self, path: &str) -> bool {
        !self.exclude.is_match(path)
    }
}
