//! Processed-corpus records
//!
//! The upstream text pipeline (cleaning, tokenization, lemmatization,
//! gender-signal inference) hands us an ordered list of utterances, each a
//! token sequence plus an optional speaker attribute. Utterances are
//! read-only for the duration of a run: resampling works over index vectors
//! into the original sequence, never over copies or mutations of it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// One processed utterance: its token sequence and the speaker attribute
/// (e.g. "M"/"F"), absent when no signal could be inferred upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    pub tokens: Vec<String>,
    #[serde(default)]
    pub attribute: Option<String>,
}

/// An ordered sequence of utterances. Positions identify records; duplicate
/// content is valid (bootstrap resampling depends on it).
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    utterances: Vec<Utterance>,
}

impl Corpus {
    pub fn new(utterances: Vec<Utterance>) -> Self {
        Self { utterances }
    }

    /// Load a processed corpus from JSON Lines: one utterance object per line,
    /// `{"tokens": [...], "attribute": "F"}` with `attribute` null or missing
    /// when unknown.
    pub fn from_jsonl_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open corpus file {}", path.display()))?;
        let reader = BufReader::new(file);

        let mut utterances = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.with_context(|| {
                format!("failed to read {} line {}", path.display(), line_no + 1)
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let utt: Utterance = serde_json::from_str(&line).with_context(|| {
                format!("invalid utterance record at {} line {}", path.display(), line_no + 1)
            })?;
            utterances.push(utt);
        }

        debug!("loaded {} utterances from {}", utterances.len(), path.display());
        Ok(Self { utterances })
    }

    /// Drop utterances with fewer than `min_tokens` tokens. The upstream
    /// pipeline normally applies this filter already; the knob exists for raw
    /// exports.
    pub fn filter_min_tokens(self, min_tokens: usize) -> Self {
        if min_tokens == 0 {
            return self;
        }
        let before = self.utterances.len();
        let utterances: Vec<Utterance> = self
            .utterances
            .into_iter()
            .filter(|u| u.tokens.len() >= min_tokens)
            .collect();
        debug!(
            "min-token filter ({}): {} -> {} utterances",
            min_tokens,
            before,
            utterances.len()
        );
        Self { utterances }
    }

    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Utterance> {
        self.utterances.iter()
    }

    /// View the corpus through an index vector (bootstrap resamples are index
    /// vectors, so trials share the one corpus allocation).
    pub fn select<'a>(&'a self, indices: &'a [usize]) -> impl Iterator<Item = &'a Utterance> {
        indices.iter().map(move |&i| &self.utterances[i])
    }

    pub fn get(&self, index: usize) -> Option<&Utterance> {
        self.utterances.get(index)
    }
}
