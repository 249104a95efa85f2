//! Execution order
//!
//! Scripts arrive sorted lexicographically. Unless the run is in order, they are shuffled with a Fisher-Yates pass
//! driven by a ChaCha generator built from the run's seed. The generator lives only for the one shuffle, and ChaCha
//! output is specified independently of platform, so a seed always reproduces the same order for the same list.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Seed reported when the run was not shuffled.
pub const NO_SEED: i64 = -1;

/// How a run was ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    /// Lexicographic order by relative name
    InOrder,
    /// Seeded shuffle of the lexicographic order
    Shuffled { seed: i64 },
}

impl Ordering {
    /// Pick the ordering for a run, reading the clock at most once.
    pub fn resolve(in_order: bool, seed: Option<i64>) -> Self {
        if in_order {
            Ordering::InOrder
        } else {
            Ordering::Shuffled {
                seed: seed.unwrap_or_else(clock_seed),
            }
        }
    }

    pub fn is_in_order(&self) -> bool {
        matches!(self, Ordering::InOrder)
    }

    /// Seed to report: the one that produced the order, or [`NO_SEED`].
    pub fn reported_seed(&self) -> i64 {
        match self {
            Ordering::InOrder => NO_SEED,
            Ordering::Shuffled { seed } => *seed,
        }
    }

    /// Reorder `items` (already sorted) according to this ordering.
    pub fn apply<T>(&self, items: &mut [T]) {
        if let Ordering::Shuffled { seed } = self {
            shuffle(items, *seed);
        }
    }
}

/// Fisher-Yates shuffle with a generator scoped to this call.
pub fn shuffle<T>(items: &mut [T], seed: i64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
    for i in (1..items.len()).rev() {
        // Drawn as u64: a usize draw consumes 32 or 64 bits depending on the target
        let j = rng.gen_range(0..=i as u64) as usize;
        items.swap(i, j);
    }
}

/// A seed derived from the nanosecond wall clock.
pub fn clock_seed() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
