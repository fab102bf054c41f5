//! Settlement minimizer
//!
//! Reduces a zero-sum balance sheet to a short list of point-to-point
//! transfers using greedy largest-magnitude matching.
//!
//! # Algorithm
//!
//! 1. Split participants into creditors (owed) and debtors (owe)
//! 2. Keep both in max-heaps keyed by magnitude
//! 3. Match the largest debtor with the largest creditor for
//!    `min(credit, debt)`, re-inserting whichever side is left over
//! 4. Stop when both heaps are empty
//!
//! Equal magnitudes are ordered by participant id, so the plan is the same on
//! every run. Each step clears at least one participant and the last step
//! clears two, so a plan never has more than `nonzero balances - 1`
//! transfers. This is not the global minimum (which is NP-hard) but it is
//! cheap and easy to explain.
//!
//! # Example
//!
//! ```text
//! Net positions:
//!   A: +500 (owed)
//!   B: -300 (owes)
//!   C: -200 (owes)
//!
//! Transfers:
//!   B pays A: 300
//!   C pays A: 200
//! ```

use crate::{types::BilateralObligation, Error, Result};
use expense_ledger::{BalanceSheet, ExpenseRecord, Money, ParticipantId, Shares, Transfer};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

/// Remaining magnitude of one side of the book
#[derive(Debug, PartialEq, Eq)]
struct Position {
    remaining: u64,
    participant: ParticipantId,
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: largest magnitude first, then smallest id first
        self.remaining
            .cmp(&other.remaining)
            .then_with(|| other.participant.cmp(&self.participant))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compute the transfers that bring every balance to zero.
///
/// Fails with [`Error::UnbalancedInput`] if the balances do not sum to
/// exactly zero, rather than returning a plan that cannot settle the group.
pub fn settle(balances: &BalanceSheet) -> Result<Vec<Transfer>> {
    let residual = balances.total();
    if residual != 0 {
        return Err(Error::UnbalancedInput { residual });
    }

    let mut creditors = BinaryHeap::new();
    let mut debtors = BinaryHeap::new();
    for (participant, net) in balances.iter() {
        let position = Position {
            remaining: net.unsigned_abs(),
            participant: participant.clone(),
        };
        if net.is_positive() {
            creditors.push(position);
        } else if net.is_negative() {
            debtors.push(position);
        }
    }

    let mut transfers = Vec::with_capacity(balances.nonzero_count().saturating_sub(1));
    loop {
        let (mut creditor, mut debtor) = match (creditors.pop(), debtors.pop()) {
            (Some(creditor), Some(debtor)) => (creditor, debtor),
            (None, None) => break,
            (Some(left), None) | (None, Some(left)) => {
                return Err(expense_ledger::Error::InvariantViolation(format!(
                    "{} left with {} unmatched cents",
                    left.participant, left.remaining
                ))
                .into());
            }
        };

        let amount = creditor.remaining.min(debtor.remaining);
        let cents = i64::try_from(amount).map_err(|_| {
            expense_ledger::Error::Overflow(format!("transfer of {} cents", amount))
        })?;

        transfers.push(Transfer {
            from: debtor.participant.clone(),
            to: creditor.participant.clone(),
            amount: Money::from_cents(cents),
        });

        creditor.remaining -= amount;
        debtor.remaining -= amount;
        if creditor.remaining > 0 {
            creditors.push(creditor);
        }
        if debtor.remaining > 0 {
            debtors.push(debtor);
        }
    }

    tracing::debug!(
        participants = balances.nonzero_count(),
        transfers = transfers.len(),
        "settlement plan computed"
    );

    Ok(transfers)
}

/// Balances after every transfer in `transfers` has been paid.
///
/// Every transfer must move a positive amount.
pub fn apply_transfers(balances: &BalanceSheet, transfers: &[Transfer]) -> Result<BalanceSheet> {
    let mut after = balances.clone();
    for transfer in transfers {
        if !transfer.amount.is_positive() {
            return Err(expense_ledger::Error::InvalidAmount(format!(
                "transfer {} must be positive",
                transfer
            ))
            .into());
        }
        let debit = Money::ZERO.checked_sub(transfer.amount).ok_or_else(|| {
            expense_ledger::Error::Overflow(format!("transfer {}", transfer))
        })?;
        after.adjust(&transfer.from, transfer.amount)?;
        after.adjust(&transfer.to, debit)?;
    }
    Ok(after)
}

/// Check that `transfers` fully settles `balances`.
///
/// On failure the residual is the total still owed to creditors.
pub fn verify_plan(balances: &BalanceSheet, transfers: &[Transfer]) -> Result<()> {
    let after = apply_transfers(balances, transfers)?;
    if after.is_settled() {
        return Ok(());
    }

    let outstanding: i128 = after
        .iter()
        .map(|(_, net)| net)
        .filter(|net| net.is_positive())
        .map(|net| i128::from(net.cents()))
        .sum();
    // A sheet can be unsettled with no creditor left, only debtors
    let residual = if outstanding == 0 {
        after.total()
    } else {
        outstanding
    };
    Err(Error::UnbalancedInput { residual })
}

/// Direct debts implied by the expenses, netted pair by pair.
///
/// Every share holder other than the payer owes the payer their share. Debts
/// in both directions between the same two people cancel down to one.
/// Expenses without a payer have no creditor and contribute nothing.
pub fn bilateral_obligations<'a, I>(expenses: I) -> Result<Vec<BilateralObligation>>
where
    I: IntoIterator<Item = (&'a ExpenseRecord, &'a Shares)>,
{
    // Keyed by (lower id, higher id); positive means lower owes higher
    let mut pairs: BTreeMap<(ParticipantId, ParticipantId), i128> = BTreeMap::new();

    for (expense, shares) in expenses {
        let Some(payer) = &expense.payer else {
            continue;
        };

        for share in shares.iter() {
            if &share.participant == payer || share.amount.is_zero() {
                continue;
            }

            let amount = i128::from(share.amount.cents());
            let (key, signed) = if share.participant < *payer {
                ((share.participant.clone(), payer.clone()), amount)
            } else {
                ((payer.clone(), share.participant.clone()), -amount)
            };
            *pairs.entry(key).or_insert(0) += signed;
        }
    }

    let mut obligations = Vec::new();
    for ((lower, higher), net) in pairs {
        let (debtor, creditor) = match net.cmp(&0) {
            Ordering::Greater => (lower, higher),
            Ordering::Less => (higher, lower),
            Ordering::Equal => continue,
        };
        obligations.push(BilateralObligation {
            debtor,
            creditor,
            amount: Money::try_from_i128(net.abs())?,
        });
    }

    Ok(obligations)
}
