//! Run configuration
//!
//! Loads `lexassoc.toml` from the working directory (or an explicit path) and
//! validates the recognized options. CLI flags override file values; file
//! values override the built-in defaults, which reproduce the original
//! study's constants (seed 375, 10k bootstrap trials, 1k permutations per
//! token, window 6, 90% confidence).

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

use crate::resample::TrialFailurePolicy;

/// Which resampling null the `analyze` entry point runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplingMode {
    /// Bootstrap-resample the corpus and recompute the association table.
    #[default]
    Bootstrap,
    /// Permute regression responses and refit per token.
    Permutation,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// PPMI smoothing factor epsilon; 0 leaves zero-joint tokens undefined.
    pub smoothing_factor: f64,
    /// Context window size; even, >= 2.
    pub window_size: usize,
    pub bootstrap_trials: usize,
    /// Permutation trials per token.
    pub permutation_trials: usize,
    /// Two-sided percentile confidence level, exclusive 0..100.
    pub confidence_level: f64,
    pub root_seed: u64,
    /// Worker cap for the resampling pool.
    pub parallelism_degree: usize,
    pub resampling_mode: ResamplingMode,
    pub on_trial_failure: TrialFailurePolicy,
    /// Attribute labels; counts/ratios are reported as A and B in this order.
    pub attribute_a: String,
    pub attribute_b: String,
    /// Drop utterances shorter than this many tokens (0 = keep all; the
    /// upstream pipeline normally filters already).
    pub min_tokens: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: 0.0,
            window_size: 6,
            bootstrap_trials: 10_000,
            permutation_trials: 1_000,
            confidence_level: 90.0,
            root_seed: 375,
            parallelism_degree: 8,
            resampling_mode: ResamplingMode::default(),
            on_trial_failure: TrialFailurePolicy::default(),
            attribute_a: "M".to_string(),
            attribute_b: "F".to_string(),
            min_tokens: 0,
        }
    }
}

impl RunConfig {
    /// Load from `path` if it exists, defaults otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        config.validate()?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size < 2 || self.window_size % 2 != 0 {
            bail!(
                "window_size must be an even integer >= 2, got {}",
                self.window_size
            );
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 100.0) {
            bail!(
                "confidence_level must be strictly between 0 and 100, got {}",
                self.confidence_level
            );
        }
        if self.parallelism_degree == 0 {
            bail!("parallelism_degree must be at least 1");
        }
        if self.smoothing_factor < 0.0 {
            bail!("smoothing_factor must be >= 0, got {}", self.smoothing_factor);
        }
        if self.bootstrap_trials == 0 || self.permutation_trials == 0 {
            bail!("trial counts must be at least 1");
        }
        if self.attribute_a == self.attribute_b {
            bail!("attribute_a and attribute_b must differ");
        }
        if self.smoothing_factor == 0.0 {
            // Not an error, but the analyst should know zero-joint tokens
            // will carry an undefined PPMI in the output.
            warn!("smoothing_factor is 0: tokens never spoken under attribute B get a null PPMI");
        }
        Ok(())
    }
}

/// Sample config written by `lexassoc init`.
pub const SAMPLE_CONFIG: &str = r#"# lexassoc.toml - resampling inference configuration

# PPMI smoothing factor. 0 reports an undefined (null) PPMI for tokens with a
# zero joint count; any positive value makes the statistic total.
smoothing_factor = 0.0

# Context window size for the embedding regression (even, >= 2). The forward
# half of the window is one token shorter than the backward half.
window_size = 6

bootstrap_trials = 10000
permutation_trials = 1000
confidence_level = 90.0
root_seed = 375
parallelism_degree = 8

# "bootstrap" or "permutation": which null `lexassoc analyze` runs.
resampling_mode = "bootstrap"

# "drop" excludes a numerically failed trial from aggregation; "abort" fails
# the whole batch instead.
on_trial_failure = "drop"

# Binary speaker attribute labels.
attribute_a = "M"
attribute_b = "F"

# Drop utterances with fewer tokens than this (0 = keep all).
min_tokens = 0
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        RunConfig::default().validate().expect("defaults validate");
    }

    #[test]
    fn test_sample_config_parses_to_defaults() {
        let config: RunConfig = toml::from_str(SAMPLE_CONFIG).expect("sample parses");
        config.validate().expect("sample validates");
        assert_eq!(config.root_seed, 375);
        assert_eq!(config.bootstrap_trials, 10_000);
        assert_eq!(config.resampling_mode, ResamplingMode::Bootstrap);
        assert_eq!(config.on_trial_failure, TrialFailurePolicy::Drop);
    }

    #[test]
    fn test_odd_window_rejected() {
        let config = RunConfig {
            window_size: 5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_confidence_bounds() {
        for level in [0.0, 100.0, -5.0, 120.0] {
            let config = RunConfig {
                confidence_level: level,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "level {level} should fail");
        }
    }

    #[test]
    fn test_identical_attributes_rejected() {
        let config = RunConfig {
            attribute_a: "F".to_string(),
            attribute_b: "F".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let config = RunConfig::load(Path::new("/nonexistent/lexassoc.toml")).expect("defaults");
        assert_eq!(config.window_size, 6);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "root_seed = 42\npermutation_trials = 50").unwrap();
        let config = RunConfig::load(file.path()).expect("load");
        assert_eq!(config.root_seed, 42);
        assert_eq!(config.permutation_trials, 50);
        assert_eq!(config.window_size, 6);
    }

    #[test]
    fn test_load_unknown_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "not_an_option = true").unwrap();
        assert!(RunConfig::load(file.path()).is_err());
    }
}
