//! Confidence intervals and empirical p-values from trial distributions
//!
//! The aggregator reduces a collection of per-trial statistic values plus the
//! observed (ground-truth) value to a two-sided percentile confidence
//! interval and a one-sided empirical p-value, independently per statistic
//! dimension. An empty trial set is a precondition violation, never a NaN.

use serde::Serialize;

use crate::stats::{StatError, StatResult};

/// How the empirical p-value reads the trial distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PValueMode {
    /// Bootstrap: fraction of trials whose ratio to the ground truth exceeds
    /// 1. Undefined (None) when the ground truth is zero or itself undefined.
    BootstrapRatio,
    /// Permutation: fraction of trials at least as large as the ground truth,
    /// the probability of the observed association under the null of no
    /// attribute effect.
    PermutationTail,
}

/// Per-dimension inference output for one token.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Inference {
    pub ground_truth: Vec<f64>,
    pub ci_low: Vec<f64>,
    pub ci_high: Vec<f64>,
    /// None marks an undefined p-value (zero ground truth in ratio mode).
    pub p_value: Vec<Option<f64>>,
    /// Trials that contributed samples (after any drop policy).
    pub samples: usize,
}

/// Aggregate trial vectors against a ground-truth vector. Every trial must
/// have the same dimensionality as the ground truth.
pub fn aggregate(
    ground_truth: &[f64],
    trials: &[Vec<f64>],
    confidence_level: f64,
    mode: PValueMode,
) -> StatResult<Inference> {
    if trials.is_empty() {
        return Err(StatError::EmptyTrialSet);
    }
    for t in trials {
        if t.len() != ground_truth.len() {
            return Err(StatError::StatisticDimension {
                expected: ground_truth.len(),
                found: t.len(),
            });
        }
    }

    let dims = ground_truth.len();
    let mut ci_low = Vec::with_capacity(dims);
    let mut ci_high = Vec::with_capacity(dims);
    let mut p_value = Vec::with_capacity(dims);

    for d in 0..dims {
        let mut samples: Vec<f64> = trials.iter().map(|t| t[d]).collect();
        samples.sort_by(f64::total_cmp);

        let offset = (100.0 - confidence_level) / 2.0;
        ci_low.push(percentile(&samples, offset));
        ci_high.push(percentile(&samples, confidence_level + offset));
        p_value.push(empirical_p_value(&samples, ground_truth[d], mode));
    }

    Ok(Inference {
        ground_truth: ground_truth.to_vec(),
        ci_low,
        ci_high,
        p_value,
        samples: trials.len(),
    })
}

/// Scalar convenience wrapper around [`aggregate`].
pub fn aggregate_scalar(
    ground_truth: f64,
    samples: &[f64],
    confidence_level: f64,
    mode: PValueMode,
) -> StatResult<Inference> {
    let trials: Vec<Vec<f64>> = samples.iter().map(|&s| vec![s]).collect();
    aggregate(&[ground_truth], &trials, confidence_level, mode)
}

fn empirical_p_value(samples: &[f64], ground_truth: f64, mode: PValueMode) -> Option<f64> {
    let n = samples.len() as f64;
    match mode {
        PValueMode::BootstrapRatio => {
            if ground_truth == 0.0 {
                return None;
            }
            let exceeds = samples.iter().filter(|&&s| s / ground_truth > 1.0).count();
            Some(exceeds as f64 / n)
        }
        PValueMode::PermutationTail => {
            let at_least = samples.iter().filter(|&&s| s >= ground_truth).count();
            Some(at_least as f64 / n)
        }
    }
}

/// Percentile with linear interpolation between order statistics (the same
/// convention as numpy's default). `sorted` must be ascending and non-empty.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * (q / 100.0).clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}
