//! Settlement Engine
//!
//! Turns a group's shared expenses into the short list of payments that
//! settles everyone up.
//!
//! # Architecture
//!
//! For each currency in the input:
//!
//! 1. **Split**: divide each expense into exact per-participant shares
//! 2. **Aggregate**: fold shares and payers into one net balance per member
//! 3. **Net**: match debtors with creditors, largest first
//! 4. **Verify**: apply the plan and check every balance lands on zero
//!
//! # Netting Algorithm
//!
//! Greedy largest-magnitude matching over two max-heaps:
//! - At most `nonzero balances - 1` transfers
//! - Ties broken by participant id, so output is reproducible
//! - Not globally minimal; the optimal problem is NP-hard
//!
//! # Example
//!
//! ```
//! use expense_ledger::{Currency, ExpenseRecord, Money, Roster};
//! use expense_settlement::{Config, SettlementEngine};
//!
//! let engine = SettlementEngine::new(Config::default())?;
//! let roster = Roster::from_ids(["alice", "bob"]);
//! let expenses = vec![ExpenseRecord::equal(
//!     Money::from_cents(3000),
//!     Some("alice".into()),
//!     vec!["alice".into(), "bob".into()],
//! )];
//!
//! let report = engine.compute(&expenses, &roster)?;
//! let usd = report.for_currency(Currency::USD).unwrap();
//! assert_eq!(usd.transfers.len(), 1);
//! assert_eq!(usd.transfers[0].amount, Money::from_cents(1500));
//! # Ok::<(), expense_settlement::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod netting;
pub mod types;

// Re-exports
pub use config::{Config, NettingConfig};
pub use engine::SettlementEngine;
pub use error::{Error, Result};
pub use metrics::Metrics;
pub use netting::{apply_transfers, bilateral_obligations, settle, verify_plan};
pub use types::*;
