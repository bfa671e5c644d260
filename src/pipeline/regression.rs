//! Permutation inference over the context-embedding regression
//!
//! For each target token: build its context vectors, fit the interceptless
//! OLS of transformed context on the is-attribute-B design column, then hold
//! X fixed and permute the response rows to draw the null distribution of the
//! normed coefficients. One child seed is spawned per token (sequentially);
//! a token's permutations run on that token's private stream, so results are
//! independent of how tokens are scheduled across workers.

use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::corpus::Corpus;
use crate::embedding::{EmbeddingTable, TransformMatrix};
use crate::infer::{aggregate, Inference, PValueMode};
use crate::resample::{permutation, ResamplingEngine, SeedSpawner, TrialFailurePolicy};
use crate::stats::{ContextVectorizer, OlsFit, Regressors, StatError};

use super::trial_bar_style;

/// Regression output for one target token.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRegression {
    pub token: String,
    /// Occurrences that produced a context vector (empty windows excluded).
    pub occurrences: usize,
    /// Permutation trials that produced a finite fit.
    pub samples: usize,
    /// None for degenerate tokens (no usable occurrence, or a singular
    /// ground-truth fit); callers must check before reading p-values.
    pub inference: Option<Inference>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegressionReport {
    pub tokens: Vec<TokenRegression>,
    pub permutation_trials: usize,
    pub confidence_level: f64,
    pub root_seed: u64,
    pub window_size: usize,
    /// Zero-vector fallbacks during context embedding; a large value means
    /// the corpus and embedding vocabularies do not match.
    pub embedding_misses: usize,
}

pub struct RegressionPipeline<'a> {
    corpus: &'a Corpus,
    embeddings: &'a EmbeddingTable,
    transform: &'a TransformMatrix,
    config: &'a RunConfig,
}

impl<'a> RegressionPipeline<'a> {
    /// Fails up front when the transform does not match the embedding space.
    pub fn new(
        corpus: &'a Corpus,
        embeddings: &'a EmbeddingTable,
        transform: &'a TransformMatrix,
        config: &'a RunConfig,
    ) -> Result<Self> {
        if transform.dim() != embeddings.dim() {
            return Err(StatError::TransformDimension {
                rows: transform.dim(),
                cols: transform.dim(),
                expected: embeddings.dim(),
            })
            .context("transform/embedding dimensionality mismatch");
        }
        Ok(Self {
            corpus,
            embeddings,
            transform,
            config,
        })
    }

    /// Run permutation inference for every token in `targets`, preserving
    /// their order in the report.
    pub fn run(&self, targets: &[String]) -> Result<RegressionReport> {
        if targets.is_empty() {
            bail!("no target tokens to regress");
        }
        let cfg = self.config;
        let vectorizer = ContextVectorizer::new(self.corpus, self.embeddings, cfg.window_size);

        // One child seed per token; each token's permutations are drawn
        // sequentially from its own stream.
        let seeds = SeedSpawner::new(cfg.root_seed).spawn_n(targets.len());
        let engine = ResamplingEngine::new(cfg.parallelism_degree, cfg.on_trial_failure);

        let bar = ProgressBar::new(targets.len() as u64).with_style(trial_bar_style());
        bar.set_message("permuting regressions");
        let started = Instant::now();

        let results = engine
            .run(&seeds, |i, rng| {
                let token = &targets[i];
                let out = self.token_inference(token, &vectorizer, |n| {
                    (0..cfg.permutation_trials)
                        .map(|_| permutation(rng, n))
                        .collect()
                })?;
                bar.inc(1);
                Ok(out)
            })
            .context("permutation batch failed")?;
        bar.finish_and_clear();
        info!(
            "regressed {} token(s) in {:?}",
            targets.len(),
            started.elapsed()
        );

        let tokens: Vec<TokenRegression> = results.into_iter().flatten().collect();
        let embedding_misses = self.embeddings.miss_count();
        if embedding_misses > 0 {
            warn!(
                "{} context-token embedding lookup(s) fell back to the zero vector",
                embedding_misses
            );
        }

        Ok(RegressionReport {
            tokens,
            permutation_trials: cfg.permutation_trials,
            confidence_level: cfg.confidence_level,
            root_seed: cfg.root_seed,
            window_size: cfg.window_size,
            embedding_misses,
        })
    }

    /// Ground-truth fit plus permutation null for one token. `draw_orders`
    /// supplies the row permutations (injected so the engine owns the rng).
    fn token_inference(
        &self,
        token: &str,
        vectorizer: &ContextVectorizer<'_>,
        draw_orders: impl FnOnce(usize) -> Vec<Vec<usize>>,
    ) -> Result<TokenRegression, StatError> {
        let cfg = self.config;
        let records = vectorizer.contexts(token);
        if records.is_empty() {
            warn!("token {token:?}: no usable occurrences, skipping inference");
            return Ok(TokenRegression {
                token: token.to_string(),
                occurrences: 0,
                samples: 0,
                inference: None,
            });
        }

        let regressors = Regressors::build(&records, &cfg.attribute_b, self.transform)?;
        let observed = match OlsFit::solve(&regressors.x, &regressors.y) {
            Ok(fit) => fit,
            // A singular ground-truth fit (every occurrence on one side of
            // the attribute) is a degenerate statistic, not a trial failure.
            Err(StatError::SingularFit) => {
                warn!("token {token:?}: singular ground-truth fit, skipping inference");
                return Ok(TokenRegression {
                    token: token.to_string(),
                    occurrences: records.len(),
                    samples: 0,
                    inference: None,
                });
            }
            Err(e) => return Err(e),
        };

        let mut samples: Vec<Vec<f64>> = Vec::with_capacity(cfg.permutation_trials);
        for order in draw_orders(regressors.nrows()) {
            let permuted = regressors.permuted_y(&order);
            match OlsFit::solve(&regressors.x, &permuted) {
                Ok(fit) => samples.push(fit.normed.iter().copied().collect()),
                Err(e) if cfg.on_trial_failure == TrialFailurePolicy::Drop => {
                    warn!("token {token:?}: dropping failed permutation: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        let ground: Vec<f64> = observed.normed.iter().copied().collect();
        let inference = match aggregate(
            &ground,
            &samples,
            cfg.confidence_level,
            PValueMode::PermutationTail,
        ) {
            Ok(inference) => Some(inference),
            Err(StatError::EmptyTrialSet) => {
                warn!("token {token:?}: every permutation failed, skipping inference");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(TokenRegression {
            token: token.to_string(),
            occurrences: records.len(),
            samples: samples.len(),
            inference,
        })
    }
}
