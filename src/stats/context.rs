//! Context windows and averaged context vectors
//!
//! For each occurrence of a target token, the surrounding window of tokens is
//! embedded and averaged into one context vector, on the principle that the
//! vector for a token is approximated by the average of its context.
//!
//! The window is deliberately asymmetric: `bounds` tokens before the
//! occurrence but only `bounds - 1` after it (`tokens[i+1..i+bounds]`), an
//! index-literal reproduction of the construction the published statistics
//! were computed with. Slices truncate at utterance boundaries rather than
//! wrap or error.

use crate::corpus::Corpus;
use crate::embedding::EmbeddingTable;
use nalgebra::DVector;
use tracing::debug;

/// One occurrence of the target token: its averaged context vector and the
/// utterance's attribute.
#[derive(Debug, Clone)]
pub struct ContextRecord {
    pub context_vector: DVector<f64>,
    pub attribute: String,
}

/// Extracts per-occurrence context vectors for target tokens.
pub struct ContextVectorizer<'a> {
    corpus: &'a Corpus,
    embeddings: &'a EmbeddingTable,
    /// Half-width of the window; window_size / 2.
    bounds: usize,
}

impl<'a> ContextVectorizer<'a> {
    /// `window_size` must be even and >= 2 (validated by the config layer).
    pub fn new(corpus: &'a Corpus, embeddings: &'a EmbeddingTable, window_size: usize) -> Self {
        debug_assert!(window_size >= 2 && window_size % 2 == 0);
        Self {
            corpus,
            embeddings,
            bounds: window_size / 2,
        }
    }

    /// All context records for `target`, in corpus order. Occurrences in
    /// utterances without an attribute are skipped, as are occurrences whose
    /// window is empty (nothing to average; the original construction would
    /// divide by zero here).
    pub fn contexts(&self, target: &str) -> Vec<ContextRecord> {
        let mut records = Vec::new();
        let mut skipped_empty = 0usize;

        for utt in self.corpus.iter() {
            let Some(attribute) = utt.attribute.as_deref() else {
                continue;
            };
            for (i, token) in utt.tokens.iter().enumerate() {
                if token != target {
                    continue;
                }
                match self.window_vector(&utt.tokens, i) {
                    Some(context_vector) => records.push(ContextRecord {
                        context_vector,
                        attribute: attribute.to_string(),
                    }),
                    None => skipped_empty += 1,
                }
            }
        }

        if skipped_empty > 0 {
            debug!(
                "skipped {} empty-window occurrence(s) of {:?}",
                skipped_empty, target
            );
        }
        records
    }

    /// Average embedding of `tokens[i-bounds..i] ++ tokens[i+1..i+bounds]`,
    /// truncated at the sequence boundaries. None when the window is empty.
    fn window_vector(&self, tokens: &[String], i: usize) -> Option<DVector<f64>> {
        let back_start = i.saturating_sub(self.bounds);
        let fwd_start = (i + 1).min(tokens.len());
        let fwd_end = (i + self.bounds).min(tokens.len());

        let window = tokens[back_start..i].iter().chain(&tokens[fwd_start..fwd_end]);

        let mut sum = DVector::zeros(self.embeddings.dim());
        let mut n = 0usize;
        for token in window {
            sum += self.embeddings.lookup(token);
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some(sum / n as f64)
    }
}
