//! Error types for spatassoc

use thiserror::Error;

/// Main error type for spatassoc operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid radius: {radius} (must be finite and > 0)")]
    InvalidRadius { radius: f64 },

    #[error("Degenerate input: {reason}")]
    DegenerateInput { reason: String },

    #[error("Inconsistent neighbor state at point {index}: {detail}")]
    InconsistentNeighborState { index: usize, detail: String },

    #[error("Non-finite coordinate at point {index}")]
    NonFiniteCoordinate { index: usize },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

impl Error {
    /// Shorthand for [`Error::DegenerateInput`]
    pub fn degenerate(reason: impl Into<String>) -> Self {
        Error::DegenerateInput {
            reason: reason.into(),
        }
    }
}

/// Result type alias for spatassoc operations
pub type Result<T> = std::result::Result<T, Error>;
