//! Expense Ledger
//!
//! Exact money, split policies and balance aggregation for shared expenses.
//!
//! # Architecture
//!
//! - **Money**: integer cents, no floating point anywhere inside the engine
//! - **Split Calculator**: expense total + policy → per-participant shares
//! - **Balance Aggregator**: split expenses + roster → net balance per member
//!
//! Every operation is a pure function of its inputs. Nothing is cached or
//! shared between calls, so all of it is safe to call from many threads.
//!
//! # Invariants
//!
//! - Shares of an expense always sum to its total, to the cent
//! - Balances of fully-paid expenses always sum to zero
//! - Same input (including participant order) → same output
//!
//! # Example
//!
//! ```
//! use expense_ledger::{compute_balances, ExpenseRecord, Money, Roster, SplitCalculator};
//!
//! let roster = Roster::from_ids(["alice", "bob", "carol"]);
//! let dinner = ExpenseRecord::equal(
//!     Money::from_cents(1000),
//!     Some("alice".into()),
//!     vec!["alice".into(), "bob".into(), "carol".into()],
//! );
//!
//! let shares = SplitCalculator::default()
//!     .compute_shares(dinner.total, &dinner.policy, &dinner.participants)?;
//! let balances = compute_balances([(&dinner, &shares)], &roster)?;
//!
//! assert_eq!(balances.get(&"alice".into()), Some(Money::from_cents(666)));
//! assert_eq!(balances.total(), 0);
//! # Ok::<(), expense_ledger::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod balance;
pub mod config;
pub mod error;
pub mod money;
pub mod split;
pub mod types;

// Re-exports
pub use balance::compute_balances;
pub use config::Config;
pub use error::{Error, Result};
pub use money::Money;
pub use split::SplitCalculator;
pub use types::{
    Balance, BalanceSheet, Currency, ExpenseId, ExpenseRecord, Participant, ParticipantId,
    Roster, Share, Shares, SplitPolicy, Transfer,
};
