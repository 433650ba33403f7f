//! Errors raised while building, updating or querying a posterior.

use thiserror::Error;

/// Error type for all `gridsuite` operations.
#[derive(Debug, Error)]
pub enum SuiteError {
    /// A grid handed to [`crate::space::HypothesisSpace`] cannot form a hypothesis set.
    #[error("invalid grid for dimension {dim}: {reason}")]
    InvalidGrid { dim: usize, reason: String },

    /// Every hypothesis scored zero for the datum, so there is nothing to renormalize.
    #[error("observation has zero likelihood under every hypothesis")]
    ZeroLikelihood,

    /// The likelihood model produced a value that cannot be a probability weight.
    #[error("likelihood for hypothesis {index} is not a finite non-negative number: {value}")]
    InvalidLikelihood { index: usize, value: f64 },

    /// The product of likelihoods over a batch is too large to represent.
    #[error("product of likelihoods overflowed for hypothesis {index}; use log-space updates")]
    LikelihoodOverflow { index: usize },

    /// A construction argument is outside its domain.
    #[error("invalid parameter `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("credible percentage must be within [0, 100], got {0}")]
    InvalidPercentage(f64),

    #[error("dimension {dim} is out of range for a {dims}-dimensional space")]
    DimensionOutOfRange { dim: usize, dims: usize },

    #[error("value {value} is not on the grid of dimension {dim}")]
    ValueNotInGrid { dim: usize, value: f64 },

    /// The selected hypotheses carry no probability mass.
    #[error("selection carries no probability mass")]
    ZeroMass,

    #[error("distribution has no values")]
    EmptyDistribution,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for `gridsuite` operations.
pub type Result<T> = std::result::Result<T, SuiteError>;
