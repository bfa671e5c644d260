//! Lexassoc - Corpus word/attribute association inference CLI
//!
//! Computes gendered word-usage statistics (PPMI association tables and
//! context-embedding regressions) with resampling-based confidence intervals
//! and empirical p-values.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    // Parse CLI args and run
    let cli = lexassoc::cli::Cli::parse();
    lexassoc::cli::run(cli)
}
