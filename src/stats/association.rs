//! Association table: ratios and smoothed PPMI per token
//!
//! Two explicit passes over the counts table: the first accumulates the
//! global totals (vocabulary usage and attribute-B usage), the second derives
//! each token's ratios and its PPMI against those totals.
//!
//! PPMI policy: with a zero smoothing factor, a token whose joint proportion
//! with attribute B is exactly zero has an *undefined* PMI (log of zero).
//! That is reported as `ppmi: None` (JSON null), never coerced to 0: a zero
//! would claim independence, which is a different statement. Any positive
//! smoothing factor makes the statistic total.

use super::counts::CountsTable;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Per-token association record.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AssociationRecord {
    pub count_a: u64,
    pub count_b: u64,
    pub total: u64,
    pub ratio_a: f64,
    pub ratio_b: f64,
    /// ratio_b - ratio_a ("F - M" in the gendered-usage setting)
    pub ratio_diff: f64,
    /// None iff smoothing is zero and the token never occurs under attribute B.
    pub ppmi: Option<f64>,
}

pub type AssociationTable = FxHashMap<String, AssociationRecord>;

/// Derives the association table from a counts table.
pub struct AssociationTableBuilder {
    smoothing_factor: f64,
}

impl AssociationTableBuilder {
    pub fn new(smoothing_factor: f64) -> Self {
        Self { smoothing_factor }
    }

    pub fn build(&self, counts: &CountsTable) -> AssociationTable {
        // Pass one: global totals.
        let mut total_vocab_usage = 0u64;
        let mut attribute_b_vocab_usage = 0u64;
        for c in counts.values() {
            total_vocab_usage += c.total();
            attribute_b_vocab_usage += c.b;
        }

        // Pass two: per-token ratios and PPMI.
        let mut table = AssociationTable::default();
        if total_vocab_usage == 0 {
            return table;
        }
        let p_j = attribute_b_vocab_usage as f64 / total_vocab_usage as f64;

        for (token, c) in counts {
            let total = c.total();
            if total == 0 {
                continue;
            }
            let ratio_a = c.a as f64 / total as f64;
            let ratio_b = c.b as f64 / total as f64;
            let p_i = total as f64 / total_vocab_usage as f64;
            let p_ij = c.b as f64 / total_vocab_usage as f64;

            table.insert(
                token.clone(),
                AssociationRecord {
                    count_a: c.a,
                    count_b: c.b,
                    total,
                    ratio_a,
                    ratio_b,
                    ratio_diff: ratio_b - ratio_a,
                    ppmi: self.ppmi(p_i, p_ij, p_j),
                },
            );
        }
        table
    }

    fn ppmi(&self, p_i: f64, p_ij: f64, p_j: f64) -> Option<f64> {
        let eps = self.smoothing_factor;
        if eps == 0.0 && p_ij == 0.0 {
            return None;
        }
        let pmi = ((p_ij + eps) / ((p_i + eps) * (p_j + eps))).log2();
        Some(pmi.max(0.0))
    }
}
