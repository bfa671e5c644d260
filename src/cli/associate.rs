//! `lexassoc associate` - PPMI table with bootstrap inference

use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::config::RunConfig;
use crate::corpus::Corpus;
use crate::pipeline::AssociationPipeline;
use crate::report;

pub fn run(
    config: &RunConfig,
    corpus_path: &Path,
    output: Option<&Path>,
    compact: bool,
) -> Result<()> {
    let corpus = Corpus::from_jsonl_path(corpus_path)?.filter_min_tokens(config.min_tokens);
    info!(
        "associating over {} utterances ({} bootstrap trials, seed {})",
        corpus.len(),
        config.bootstrap_trials,
        config.root_seed
    );

    let pipeline_report = AssociationPipeline::new(&corpus, config).run()?;

    let rendered = if compact {
        report::render_compact(&pipeline_report)?
    } else {
        report::render(&pipeline_report)?
    };
    report::write(&rendered, output)
}
