//! `lexassoc regress` - context-embedding regression with permutation inference

use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::config::RunConfig;
use crate::corpus::Corpus;
use crate::embedding::{EmbeddingTable, TransformMatrix};
use crate::pipeline::RegressionPipeline;
use crate::report;
use crate::stats::TokenCounter;

pub fn run(
    config: &RunConfig,
    corpus_path: &Path,
    embeddings_path: &Path,
    transform_path: Option<&Path>,
    tokens: &[String],
    output: Option<&Path>,
    compact: bool,
) -> Result<()> {
    let corpus = Corpus::from_jsonl_path(corpus_path)?.filter_min_tokens(config.min_tokens);
    let embeddings = EmbeddingTable::from_text_path(embeddings_path)?;
    let transform = match transform_path {
        Some(path) => TransformMatrix::from_f32le_path(path, embeddings.dim())?,
        None => TransformMatrix::identity(embeddings.dim()),
    };

    let targets: Vec<String> = if tokens.is_empty() {
        vocabulary(&corpus, config)
    } else {
        tokens.to_vec()
    };
    info!(
        "regressing {} token(s) over {} utterances ({} permutations each, seed {})",
        targets.len(),
        corpus.len(),
        config.permutation_trials,
        config.root_seed
    );

    let pipeline = RegressionPipeline::new(&corpus, &embeddings, &transform, config)?;
    let pipeline_report = pipeline.run(&targets)?;

    let rendered = if compact {
        report::render_compact(&pipeline_report)?
    } else {
        report::render(&pipeline_report)?
    };
    report::write(&rendered, output)
}

/// Default target set: every token spoken under either attribute, sorted for
/// a deterministic seed-to-token assignment.
fn vocabulary(corpus: &Corpus, config: &RunConfig) -> Vec<String> {
    let counts =
        TokenCounter::new(&config.attribute_a, &config.attribute_b).count(corpus.iter());
    let mut tokens: Vec<String> = counts.into_keys().collect();
    tokens.sort();
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Utterance;

    #[test]
    fn test_vocabulary_is_sorted_and_deduplicated() {
        let corpus = Corpus::new(vec![
            Utterance {
                tokens: vec!["b".into(), "a".into(), "b".into()],
                attribute: Some("M".into()),
            },
            Utterance {
                tokens: vec!["c".into()],
                attribute: Some("F".into()),
            },
        ]);
        let config = RunConfig::default();
        assert_eq!(vocabulary(&corpus, &config), vec!["a", "b", "c"]);
    }
}
