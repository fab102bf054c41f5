//! Core types for the settlement engine

use expense_ledger::{BalanceSheet, Currency, Money, ParticipantId, Transfer};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direct debt between two participants, before multilateral netting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilateralObligation {
    /// Participant who owes
    pub debtor: ParticipantId,

    /// Participant who is owed
    pub creditor: ParticipantId,

    /// Amount owed, always positive
    pub amount: Money,
}

/// Netting statistics for one settlement plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NettingStats {
    /// Participants with a nonzero balance
    pub participant_count: usize,

    /// Number of direct (bilateral) obligations
    pub gross_obligation_count: usize,

    /// Total of the direct obligations
    pub gross_amount: Money,

    /// Number of transfers in the plan
    pub transfer_count: usize,

    /// Total moved by the plan
    pub net_amount: Money,

    /// Amount that never has to move
    pub amount_saved: Money,

    /// Netting efficiency (0.0 - 1.0)
    /// Higher = more netting
    pub efficiency: f64,

    /// Direct obligations replaced by the plan
    pub transfers_eliminated: usize,
}

impl NettingStats {
    /// Compare a plan against the direct obligations it replaces
    pub fn compute(
        balances: &BalanceSheet,
        obligations: &[BilateralObligation],
        transfers: &[Transfer],
    ) -> expense_ledger::Result<Self> {
        let gross_amount = Money::checked_sum(obligations.iter().map(|o| o.amount))?;
        let net_amount = Money::checked_sum(transfers.iter().map(|t| t.amount))?;
        let amount_saved = gross_amount
            .checked_sub(net_amount)
            .unwrap_or(Money::ZERO)
            .max(Money::ZERO);

        Ok(Self {
            participant_count: balances.nonzero_count(),
            gross_obligation_count: obligations.len(),
            gross_amount,
            transfer_count: transfers.len(),
            net_amount,
            amount_saved,
            efficiency: efficiency(gross_amount, amount_saved),
            transfers_eliminated: obligations.len().saturating_sub(transfers.len()),
        })
    }
}

fn efficiency(gross: Money, saved: Money) -> f64 {
    if !gross.is_positive() {
        return 0.0;
    }

    let ratio = Decimal::from(saved.cents()) / Decimal::from(gross.cents());
    ratio.to_f64().unwrap_or(0.0)
}

/// Settlement of all expenses in one currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencySettlement {
    /// Currency of every amount below
    pub currency: Currency,

    /// Expenses that went into the balances
    pub expense_count: usize,

    /// Expenses left out because no payer was recorded
    pub excluded_unpaid: usize,

    /// Net balances before settlement
    pub balances: BalanceSheet,

    /// Direct obligations before netting
    pub obligations: Vec<BilateralObligation>,

    /// Transfers that settle the group
    pub transfers: Vec<Transfer>,

    /// Netting statistics
    pub stats: NettingStats,
}

/// Full settlement result, one entry per currency in currency order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettlementReport {
    /// Per-currency settlements
    pub settlements: Vec<CurrencySettlement>,
}

impl SettlementReport {
    /// Settlement for one currency
    pub fn for_currency(&self, currency: Currency) -> Option<&CurrencySettlement> {
        self.settlements.iter().find(|s| s.currency == currency)
    }

    /// Transfers across every currency
    pub fn transfer_count(&self) -> usize {
        self.settlements.iter().map(|s| s.transfers.len()).sum()
    }

    /// True when nobody owes anything
    pub fn is_empty(&self) -> bool {
        self.transfer_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(from: &str, to: &str, cents: i64) -> Transfer {
        Transfer {
            from: from.into(),
            to: to.into(),
            amount: Money::from_cents(cents),
        }
    }

    fn obligation(debtor: &str, creditor: &str, cents: i64) -> BilateralObligation {
        BilateralObligation {
            debtor: debtor.into(),
            creditor: creditor.into(),
            amount: Money::from_cents(cents),
        }
    }

    #[test]
    fn test_netting_stats() {
        let balances: BalanceSheet = [
            ("A".into(), Money::from_cents(-5000)),
            ("B".into(), Money::from_cents(2000)),
            ("C".into(), Money::from_cents(3000)),
        ]
        .into_iter()
        .collect();
        let obligations = vec![
            obligation("A", "B", 10000),
            obligation("B", "C", 8000),
            obligation("C", "A", 5000),
        ];
        let transfers = vec![transfer("A", "C", 3000), transfer("A", "B", 2000)];

        let stats = NettingStats::compute(&balances, &obligations, &transfers).unwrap();

        assert_eq!(stats.participant_count, 3);
        assert_eq!(stats.gross_amount, Money::from_cents(23000));
        assert_eq!(stats.net_amount, Money::from_cents(5000));
        assert_eq!(stats.amount_saved, Money::from_cents(18000));
        assert_eq!(stats.transfers_eliminated, 1);
        assert!((stats.efficiency - 0.782).abs() < 0.01);
    }

    #[test]
    fn test_netting_stats_empty() {
        let stats = NettingStats::compute(&BalanceSheet::new(), &[], &[]).unwrap();
        assert_eq!(stats.efficiency, 0.0);
        assert_eq!(stats.transfer_count, 0);
    }
}
