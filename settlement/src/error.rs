//! Error types for the settlement engine

use std::time::Duration;
use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
#[derive(Error, Debug)]
pub enum Error {
    /// Split or aggregation error
    #[error("Ledger error: {0}")]
    Ledger(#[from] expense_ledger::Error),

    /// Balances handed to the minimizer do not sum to zero
    #[error("Balances do not sum to zero (residual {residual} cents)")]
    UnbalancedInput {
        /// Amount left unsettled, in cents; wider than `Money` so any sum fits
        residual: i128,
    },

    /// Computation exceeded the request deadline
    #[error("Settlement timed out after {0:?}")]
    Timeout(Duration),

    /// Computation was abandoned because its deadline had passed
    #[error("Settlement abandoned after its deadline")]
    Cancelled,

    /// Blocking task failed to complete
    #[error("Settlement task failed: {0}")]
    Join(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err.to_string())
    }
}
