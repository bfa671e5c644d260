//! Per-token, per-attribute occurrence counts
//!
//! First of the two association passes: tally how often each token is spoken
//! under each attribute value. The second pass (ratios, PPMI) lives in
//! `stats::association`.

use crate::corpus::Utterance;
use rustc_hash::FxHashMap;

/// Occurrence counts for one token under the two attribute values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributeCounts {
    pub a: u64,
    pub b: u64,
}

impl AttributeCounts {
    pub fn total(&self) -> u64 {
        self.a + self.b
    }
}

/// token -> per-attribute counts. Absent token means zero occurrences; there
/// are no implicit-default entries.
pub type CountsTable = FxHashMap<String, AttributeCounts>;

/// Tallies token occurrences by attribute value over a pass of the corpus.
pub struct TokenCounter<'a> {
    attribute_a: &'a str,
    attribute_b: &'a str,
}

impl<'a> TokenCounter<'a> {
    pub fn new(attribute_a: &'a str, attribute_b: &'a str) -> Self {
        Self {
            attribute_a,
            attribute_b,
        }
    }

    /// Count over any sequence of utterances (the full corpus or a bootstrap
    /// index view). Utterances without an attribute, or with an attribute
    /// outside the configured pair, contribute nothing; they should have been
    /// filtered upstream and are skipped rather than treated as an error.
    pub fn count<'u>(&self, utterances: impl IntoIterator<Item = &'u Utterance>) -> CountsTable {
        let mut counts = CountsTable::default();
        for utt in utterances {
            let Some(attribute) = utt.attribute.as_deref() else {
                continue;
            };
            let is_a = attribute == self.attribute_a;
            let is_b = attribute == self.attribute_b;
            if !is_a && !is_b {
                continue;
            }
            for token in &utt.tokens {
                let entry = counts.entry(token.clone()).or_default();
                if is_a {
                    entry.a += 1;
                } else {
                    entry.b += 1;
                }
            }
        }
        counts
    }
}
