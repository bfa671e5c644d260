//! Token-level statistics
//!
//! The two test statistics the resampling engine drives:
//! - counts → association table → smoothed PPMI per token
//! - context windows → design/response matrices → interceptless OLS and the
//!   per-regressor norm of its coefficients

pub mod association;
pub mod context;
pub mod counts;
pub mod regression;

pub use association::{AssociationRecord, AssociationTable, AssociationTableBuilder};
pub use context::{ContextRecord, ContextVectorizer};
pub use counts::{AttributeCounts, CountsTable, TokenCounter};
pub use regression::{OlsFit, Regressors};

use thiserror::Error;

/// Errors from the statistical core. Input-contract violations are fatal;
/// degenerate fits are recoverable per the engine's trial-failure policy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatError {
    #[error("design matrix has {x_rows} rows but response matrix has {y_rows}")]
    ShapeMismatch { x_rows: usize, y_rows: usize },

    #[error("transform matrix is {rows}x{cols}, expected square of dimension {expected}")]
    TransformDimension {
        rows: usize,
        cols: usize,
        expected: usize,
    },

    #[error("least-squares fit is singular (X'X not invertible)")]
    SingularFit,

    #[error("no occurrences of token {0:?} produced a context vector")]
    NoContext(String),

    #[error("cannot aggregate an empty trial set")]
    EmptyTrialSet,

    #[error("resampling engine failure: {0}")]
    Engine(String),

    #[error("statistic dimension mismatch: ground truth has {expected}, trial has {found}")]
    StatisticDimension { expected: usize, found: usize },
}

pub type StatResult<T> = Result<T, StatError>;
