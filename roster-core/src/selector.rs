//! Candidate selection
//!
//! Reviewers are drawn uniformly at random, without replacement, from an
//! explicit candidate list. The random source is owned by a
//! [`ReviewerSelector`] handed to whoever needs it, so tests can seed it.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Pick `count` distinct items from `candidates`
///
/// Returns `min(count, candidates.len())` items. When every candidate is
/// needed they are returned as-is, in input order, and `rng` is not touched.
pub fn select<'a, T, R>(rng: &mut R, candidates: &'a [T], count: usize) -> Vec<&'a T>
where
    R: Rng + ?Sized,
{
    if count >= candidates.len() {
        return candidates.iter().collect();
    }

    rand::seq::index::sample(rng, candidates.len(), count)
        .into_iter()
        .map(|idx| &candidates[idx])
        .collect()
}

/// Shared random source for reviewer selection
pub struct ReviewerSelector {
    rng: Mutex<StdRng>,
}

impl ReviewerSelector {
    /// Selector seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Selector with a fixed seed, for reproducible picks
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Seeded when `seed` is given, entropy otherwise
    pub fn with_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// Pick up to `count` candidates
    pub fn pick<'a, T>(&self, candidates: &'a [T], count: usize) -> Vec<&'a T> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        select(&mut *rng, candidates, count)
    }
}

impl Default for ReviewerSelector {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl std::fmt::Debug for ReviewerSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewerSelector").finish_non_exhaustive()
    }
}
