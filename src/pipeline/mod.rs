//! Inference pipelines
//!
//! Orchestrates the two ground-truth-plus-null paths:
//! - association: counts -> PPMI table -> bootstrap the corpus -> per-token
//!   confidence intervals and empirical p-values
//! - regression: per target token, context vectors -> interceptless OLS ->
//!   permute the response rows -> permutation p-values and intervals
//!
//! Both paths share the one read-only corpus (trials see index views, never
//! copies) and the deterministic seed-spawning discipline from `resample`.

mod association;
mod regression;

pub use association::{AssociationPipeline, AssociationReport, TokenAssociation};
pub use regression::{RegressionPipeline, RegressionReport, TokenRegression};

use indicatif::ProgressStyle;

/// Progress bar style shared by both pipelines.
pub(crate) fn trial_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap()
        .progress_chars("█▓▒░  ")
}
