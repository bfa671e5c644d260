//! Deterministic-seeded parallel resampling
//!
//! Monte-Carlo trials are embarrassingly parallel but must be bit-reproducible
//! for a fixed root seed no matter how many workers run them. The scheme:
//! a `SeedSpawner` derives one full-entropy 32-byte child seed per trial,
//! sequentially, from a single root ChaCha stream; each trial then constructs
//! its own `ChaCha8Rng` from its child seed. Workers never share a stream,
//! and trial outputs are collected in trial-index order regardless of
//! completion order.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Deserialize;
use tracing::warn;

use crate::stats::{StatError, StatResult};

/// A 32-byte child seed for one trial's private random stream.
pub type TrialSeed = [u8; 32];

/// Sequential, collision-resistant child-seed derivation from one root seed.
/// Mirrors the SeedSequence-spawn discipline: the spawn step itself is never
/// parallelized, so child seeds are independent of worker scheduling.
pub struct SeedSpawner {
    root: ChaCha8Rng,
}

impl SeedSpawner {
    pub fn new(root_seed: u64) -> Self {
        Self {
            root: ChaCha8Rng::seed_from_u64(root_seed),
        }
    }

    pub fn spawn(&mut self) -> TrialSeed {
        let mut seed = TrialSeed::default();
        self.root.fill_bytes(&mut seed);
        seed
    }

    pub fn spawn_n(&mut self, n: usize) -> Vec<TrialSeed> {
        (0..n).map(|_| self.spawn()).collect()
    }
}

/// What to do when a single trial fails numerically (e.g. a degenerate fit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialFailurePolicy {
    /// Log and exclude the trial from aggregation (the default).
    #[default]
    Drop,
    /// Fail the whole batch on the first trial error.
    Abort,
}

/// Draw `n` indices with replacement; a bootstrap resample of an `n`-record
/// corpus as an index vector (the corpus itself is never copied).
pub fn bootstrap_indices(rng: &mut ChaCha8Rng, n: usize) -> Vec<usize> {
    (0..n).map(|_| rng.random_range(0..n)).collect()
}

/// Draw a random permutation of `0..n` (Fisher-Yates).
pub fn permutation(rng: &mut ChaCha8Rng, n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        let j = rng.random_range(0..=i);
        order.swap(i, j);
    }
    order
}

/// Runs independent trials on a bounded rayon pool, one private random stream
/// per trial, preserving trial order in the output.
pub struct ResamplingEngine {
    parallelism: usize,
    failure_policy: TrialFailurePolicy,
}

impl ResamplingEngine {
    pub fn new(parallelism: usize, failure_policy: TrialFailurePolicy) -> Self {
        Self {
            parallelism: parallelism.max(1),
            failure_policy,
        }
    }

    /// Run one trial per seed. The closure gets the trial index and a rng
    /// seeded from that trial's child seed; it must not touch any other
    /// source of randomness or mutable shared state.
    ///
    /// Returns one slot per trial, in trial order. Under the `Drop` policy a
    /// failed trial's slot is `None`; under `Abort` the first failure is
    /// returned as the batch error.
    pub fn run<T, F>(&self, seeds: &[TrialSeed], trial: F) -> StatResult<Vec<Option<T>>>
    where
        T: Send,
        F: Fn(usize, &mut ChaCha8Rng) -> StatResult<T> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism)
            .build()
            .map_err(|e| StatError::Engine(format!("failed to build thread pool: {e}")))?;

        let results: Vec<StatResult<T>> = pool.install(|| {
            seeds
                .par_iter()
                .enumerate()
                .map(|(i, seed)| {
                    let mut rng = ChaCha8Rng::from_seed(*seed);
                    trial(i, &mut rng)
                })
                .collect()
        });

        let mut out = Vec::with_capacity(results.len());
        let mut dropped = 0usize;
        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(value) => out.push(Some(value)),
                Err(e) => match self.failure_policy {
                    TrialFailurePolicy::Abort => return Err(e),
                    TrialFailurePolicy::Drop => {
                        warn!("dropping failed trial {i}: {e}");
                        dropped += 1;
                        out.push(None);
                    }
                },
            }
        }
        if dropped > 0 {
            warn!("{dropped}/{} trial(s) dropped from aggregation", out.len());
        }
        Ok(out)
    }
}
