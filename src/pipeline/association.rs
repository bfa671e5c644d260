//! Bootstrap inference over the PPMI association table
//!
//! Ground truth is the association table of the observed corpus. Each trial
//! draws a with-replacement resample (as an index vector into the shared
//! corpus), rebuilds the table, and contributes that trial's PPMI per token.
//! A token absent from a resample simply contributes no sample for that
//! trial, so sample counts vary by token and are reported.

use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::corpus::Corpus;
use crate::infer::{aggregate_scalar, Inference, PValueMode};
use crate::resample::{bootstrap_indices, ResamplingEngine, SeedSpawner};
use crate::stats::{AssociationRecord, AssociationTableBuilder, TokenCounter};

use super::trial_bar_style;

/// Association output for one token.
#[derive(Debug, Clone, Serialize)]
pub struct TokenAssociation {
    pub token: String,
    #[serde(flatten)]
    pub record: AssociationRecord,
    /// Bootstrap trials in which the token appeared with a defined PPMI.
    pub samples: usize,
    /// None when the ground-truth PPMI is undefined or no trial produced a
    /// sample; callers must check before reading p-values.
    pub inference: Option<Inference>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssociationReport {
    pub tokens: Vec<TokenAssociation>,
    pub bootstrap_trials: usize,
    pub confidence_level: f64,
    pub root_seed: u64,
    pub smoothing_factor: f64,
}

pub struct AssociationPipeline<'a> {
    corpus: &'a Corpus,
    config: &'a RunConfig,
}

impl<'a> AssociationPipeline<'a> {
    pub fn new(corpus: &'a Corpus, config: &'a RunConfig) -> Self {
        Self { corpus, config }
    }

    pub fn run(&self) -> Result<AssociationReport> {
        if self.corpus.is_empty() {
            bail!("cannot run association inference over an empty corpus");
        }
        let cfg = self.config;
        let counter = TokenCounter::new(&cfg.attribute_a, &cfg.attribute_b);
        let builder = AssociationTableBuilder::new(cfg.smoothing_factor);

        let started = Instant::now();
        let ground_truth = builder.build(&counter.count(self.corpus.iter()));
        info!(
            "ground-truth association table: {} tokens in {:?}",
            ground_truth.len(),
            started.elapsed()
        );

        // One child seed per bootstrap trial, spawned sequentially.
        let seeds = SeedSpawner::new(cfg.root_seed).spawn_n(cfg.bootstrap_trials);
        let engine = ResamplingEngine::new(cfg.parallelism_degree, cfg.on_trial_failure);

        let bar = ProgressBar::new(cfg.bootstrap_trials as u64).with_style(trial_bar_style());
        bar.set_message("bootstrapping association table");

        let n = self.corpus.len();
        let trials = engine
            .run(&seeds, |_, rng| {
                let indices = bootstrap_indices(rng, n);
                let table = builder.build(&counter.count(self.corpus.select(&indices)));
                let ppmi: FxHashMap<String, f64> = table
                    .into_iter()
                    .filter_map(|(token, record)| record.ppmi.map(|p| (token, p)))
                    .collect();
                bar.inc(1);
                Ok(ppmi)
            })
            .context("bootstrap batch failed")?;
        bar.finish_and_clear();
        info!(
            "{} bootstrap trials in {:?}",
            cfg.bootstrap_trials,
            started.elapsed()
        );

        // Deterministic output order.
        let mut tokens: Vec<&String> = ground_truth.keys().collect();
        tokens.sort();

        let mut out = Vec::with_capacity(tokens.len());
        for token in tokens {
            let record = ground_truth[token].clone();
            let samples: Vec<f64> = trials
                .iter()
                .flatten()
                .filter_map(|table| table.get(token).copied())
                .collect();

            let inference = match (record.ppmi, samples.is_empty()) {
                (Some(observed), false) => Some(
                    aggregate_scalar(
                        observed,
                        &samples,
                        cfg.confidence_level,
                        PValueMode::BootstrapRatio,
                    )
                    .with_context(|| format!("aggregating token {token:?}"))?,
                ),
                _ => {
                    debug!(
                        "token {:?}: no inference (ppmi defined: {}, samples: {})",
                        token,
                        record.ppmi.is_some(),
                        samples.len()
                    );
                    None
                }
            };

            out.push(TokenAssociation {
                token: token.clone(),
                record,
                samples: samples.len(),
                inference,
            });
        }

        Ok(AssociationReport {
            tokens: out,
            bootstrap_trials: cfg.bootstrap_trials,
            confidence_level: cfg.confidence_level,
            root_seed: cfg.root_seed,
            smoothing_factor: cfg.smoothing_factor,
        })
    }
}
