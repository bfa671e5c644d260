//! Lexassoc - Resampling-based inference for gendered word usage
//!
//! Quantifies how strongly individual word tokens associate with a binary
//! speaker attribute (e.g. inferred gender) in a corpus of spoken utterances,
//! two ways:
//! - a smoothed PPMI association score per token, with bootstrap confidence
//!   intervals and empirical p-values, and
//! - an ALC-style context-embedding regression per token, with permutation
//!   p-values and percentile confidence intervals.
//!
//! Corpus acquisition, cleaning, tokenization and gender-signal inference are
//! upstream concerns; the crate consumes an already-processed corpus.

pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod infer;
pub mod pipeline;
pub mod report;
pub mod resample;
pub mod stats;
