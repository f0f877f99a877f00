//! Error types for the CRLD crate

use thiserror::Error;

/// Main error type for the CRLD crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("inconsistent number of {what}: {context}")]
    DimensionMismatch { what: String, context: String },

    #[error("{tensor} is not row-stochastic: row {row} sums to {sum}")]
    NotStochastic {
        tensor: String,
        row: String,
        sum: f64,
    },

    #[error("discount factor {value} for agent {agent} must lie in [0, 1)")]
    InvalidDiscountFactor { agent: usize, value: f64 },

    #[error("expected {expected} per-agent values for '{parameter}', got {got}")]
    ParameterLength {
        parameter: String,
        expected: usize,
        got: usize,
    },

    #[error("policy has shape {got:?}, expected {expected:?}")]
    PolicyShape {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("contraction failed: {message}")]
    Contraction { message: String },

    #[error("no stationary distribution found for {context} ({size} x {size} chain)")]
    NoStationaryDistribution { context: String, size: usize },

    #[error("value system for agent {agent} is singular")]
    SingularValueSystem { agent: usize },

    #[error("policy became non-finite at step {step}")]
    NonFinitePolicy { step: usize },

    #[error("invalid progress bar template: {message}")]
    ProgressBarTemplate { message: String },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("invalid solve mode '{input}'. Expected one of: {expected}")]
    ParseSolveMode { input: String, expected: String },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}

impl From<ndarray::ShapeError> for Error {
    fn from(source: ndarray::ShapeError) -> Self {
        Error::Contraction {
            message: source.to_string(),
        }
    }
}
