//! CLI command definitions and handlers

mod associate;
mod init;
mod regress;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ResamplingMode, RunConfig};

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Lexassoc - Resampling-based word/attribute association inference
#[derive(Parser, Debug)]
#[command(name = "lexassoc")]
#[command(
    version,
    about = "PPMI association tables and context-embedding regressions with bootstrap/permutation inference",
    long_about = "Lexassoc quantifies how strongly word tokens associate with a binary speaker \
attribute (e.g. inferred gender) in a processed corpus of utterances.\n\n\
Two statistics: a smoothed PPMI per token (bootstrap confidence intervals and \
p-values) and an ALC-style context-embedding regression per token (permutation \
p-values). Runs are bit-reproducible for a fixed root seed, regardless of \
worker count.",
    after_help = "\
Examples:
  lexassoc init                                     Write a sample lexassoc.toml
  lexassoc associate corpus.jsonl                   PPMI table + bootstrap inference
  lexassoc associate corpus.jsonl -o table.json     Write the report to a file
  lexassoc regress corpus.jsonl --embeddings glove.txt --transform 6B.100d.bin
  lexassoc regress corpus.jsonl --embeddings glove.txt --tokens justice,court
  lexassoc analyze corpus.jsonl                     Run the mode set in lexassoc.toml"
)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, default_value = "lexassoc.toml")]
    pub config: PathBuf,

    /// Number of parallel workers (1-64), overrides the config file
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Root seed for the resampling batch, overrides the config file
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a lexassoc.toml config file with example settings
    Init,

    /// Build the PPMI association table with bootstrap confidence intervals
    Associate {
        /// Processed corpus (JSON Lines: {"tokens": [...], "attribute": "F"})
        corpus: PathBuf,

        /// Bootstrap trial count, overrides the config file
        #[arg(long)]
        trials: Option<usize>,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Compact single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Run the context-embedding regression with permutation inference
    Regress {
        /// Processed corpus (JSON Lines: {"tokens": [...], "attribute": "F"})
        corpus: PathBuf,

        /// Embedding table (text format: token v1 v2 ... vD per line)
        #[arg(long)]
        embeddings: PathBuf,

        /// Square transform matrix (raw little-endian f32); identity if absent
        #[arg(long)]
        transform: Option<PathBuf>,

        /// Comma-separated target tokens (default: the whole vocabulary)
        #[arg(long, value_delimiter = ',')]
        tokens: Vec<String>,

        /// Permutation trials per token, overrides the config file
        #[arg(long)]
        trials: Option<usize>,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Compact single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Run whichever resampling mode the config file selects
    Analyze {
        /// Processed corpus (JSON Lines: {"tokens": [...], "attribute": "F"})
        corpus: PathBuf,

        /// Embedding table, required in permutation mode
        #[arg(long)]
        embeddings: Option<PathBuf>,

        /// Square transform matrix (raw little-endian f32); identity if absent
        #[arg(long)]
        transform: Option<PathBuf>,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    let mut config = RunConfig::load(&cli.config)?;
    if let Some(workers) = cli.workers {
        config.parallelism_degree = workers;
    }
    if let Some(seed) = cli.seed {
        config.root_seed = seed;
    }

    match cli.command {
        Commands::Init => init::run(&cli.config),
        Commands::Associate {
            corpus,
            trials,
            output,
            compact,
        } => {
            if let Some(trials) = trials {
                config.bootstrap_trials = trials;
            }
            config.validate()?;
            associate::run(&config, &corpus, output.as_deref(), compact)
        }
        Commands::Regress {
            corpus,
            embeddings,
            transform,
            tokens,
            trials,
            output,
            compact,
        } => {
            if let Some(trials) = trials {
                config.permutation_trials = trials;
            }
            config.validate()?;
            regress::run(
                &config,
                &corpus,
                &embeddings,
                transform.as_deref(),
                &tokens,
                output.as_deref(),
                compact,
            )
        }
        Commands::Analyze {
            corpus,
            embeddings,
            transform,
            output,
        } => {
            config.validate()?;
            match config.resampling_mode {
                ResamplingMode::Bootstrap => {
                    associate::run(&config, &corpus, output.as_deref(), false)
                }
                ResamplingMode::Permutation => {
                    let Some(embeddings) = embeddings else {
                        bail!("permutation mode requires --embeddings");
                    };
                    regress::run(
                        &config,
                        &corpus,
                        &embeddings,
                        transform.as_deref(),
                        &[],
                        output.as_deref(),
                        false,
                    )
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_workers_bounds() {
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("65").is_err());
        assert!(parse_workers("abc").is_err());
        assert_eq!(parse_workers("8"), Ok(8));
    }

    #[test]
    fn test_parse_regress_token_list() {
        let cli = Cli::parse_from([
            "lexassoc",
            "regress",
            "corpus.jsonl",
            "--embeddings",
            "glove.txt",
            "--tokens",
            "justice,court",
        ]);
        match cli.command {
            Commands::Regress { tokens, .. } => {
                assert_eq!(tokens, vec!["justice".to_string(), "court".to_string()]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
