//! Error types for the expense ledger

use crate::money::Money;
use crate::types::{Currency, ExpenseId, ParticipantId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A split was requested over zero participants
    #[error("Expense has no participants to split between")]
    EmptyParticipantSet,

    /// Split policy names a participant the expense does not apply to
    #[error("Participant {participant} is not part of this expense")]
    UnknownParticipant {
        /// Offending participant
        participant: ParticipantId,
    },

    /// Participant listed more than once in a split
    #[error("Participant {participant} appears more than once")]
    DuplicateParticipant {
        /// Offending participant
        participant: ParticipantId,
    },

    /// Exact amounts do not add up to the expense total
    #[error("Exact amounts differ from the expense total by {discrepancy}")]
    SplitMismatch {
        /// Expense total minus the sum of the supplied amounts
        discrepancy: Money,
    },

    /// A single percentage is outside 0..=100
    #[error("Percentage {percentage} for {participant} is outside 0-100")]
    InvalidPercentage {
        /// Offending participant
        participant: ParticipantId,
        /// Supplied percentage
        percentage: Decimal,
    },

    /// Percentages do not total 100
    #[error("Percentages total {total}, expected 100")]
    InvalidPercentageTotal {
        /// Sum of the supplied percentages
        total: Decimal,
    },

    /// Expense references someone outside the group roster
    #[error("Participant {participant} in expense {expense_id} is not in the roster")]
    ParticipantNotInRoster {
        /// Offending participant
        participant: ParticipantId,
        /// Expense that referenced them
        expense_id: ExpenseId,
    },

    /// Expenses in different currencies were aggregated together
    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch {
        /// Currency of the first expense seen
        expected: Currency,
        /// Currency that did not match
        found: Currency,
    },

    /// Integer overflow in cent arithmetic
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// Invariant violation (money conservation)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Amount could not be converted at the boundary
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error while loading configuration
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
