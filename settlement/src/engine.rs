//! Main settlement engine
//!
//! Orchestrates splitting, balance aggregation and netting for a group's
//! expenses, one currency at a time.

use crate::{
    config::Config,
    metrics::Metrics,
    netting::{bilateral_obligations, settle, verify_plan},
    types::*,
    Error, Result,
};
use expense_ledger::{
    compute_balances, Currency, ExpenseRecord, Roster, Shares, SplitCalculator,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Settlement engine
#[derive(Debug)]
pub struct SettlementEngine {
    /// Split calculator
    splitter: SplitCalculator,

    /// Metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl SettlementEngine {
    /// Create new settlement engine
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            include_unpaid = config.netting.include_unpaid_expenses,
            "Settlement engine initialized"
        );

        Ok(Self {
            splitter: SplitCalculator::new(&config.ledger),
            metrics: Metrics::new()?,
            config,
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Engine metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Compute the settlement plan for every currency in `expenses`.
    ///
    /// Expenses without a payer are left out unless
    /// `netting.include_unpaid_expenses` is set, in which case the affected
    /// currency fails with `UnbalancedInput`.
    pub fn compute(
        &self,
        expenses: &[ExpenseRecord],
        roster: &Roster,
    ) -> Result<SettlementReport> {
        self.run(expenses, roster, &AtomicBool::new(false))
    }

    /// Run [`compute`](Self::compute) on the blocking pool under the
    /// configured request timeout.
    ///
    /// Once the deadline passes the blocking task stops at its next
    /// checkpoint and its outcome is neither returned nor counted.
    pub async fn compute_with_deadline(
        self: &Arc<Self>,
        expenses: Vec<ExpenseRecord>,
        roster: Roster,
    ) -> Result<SettlementReport> {
        let engine = Arc::clone(self);
        let claimed = Arc::new(AtomicBool::new(false));
        let task_claimed = Arc::clone(&claimed);
        let timeout = self.config.request_timeout();
        let mut task = tokio::task::spawn_blocking(move || {
            engine.run(&expenses, &roster, &task_claimed)
        });

        let waited = tokio::time::timeout(timeout, &mut task).await;
        let joined = match waited {
            Ok(joined) => joined,
            // The task finished first and already owns the outcome
            Err(_) if claimed.swap(true, Ordering::AcqRel) => task.await,
            Err(_) => {
                self.metrics.record_failure();
                tracing::warn!(timeout_ms = self.config.request_timeout_ms, "Settlement timed out");
                return Err(Error::Timeout(timeout));
            }
        };

        joined.unwrap_or_else(|join_error| {
            self.metrics.record_failure();
            Err(Error::Join(join_error.to_string()))
        })
    }

    /// Compute and record the outcome, unless `claimed` is taken first.
    ///
    /// `claimed` is checked between expenses and swapped once at the end;
    /// whoever swaps it first owns the metrics for the request.
    fn run(
        &self,
        expenses: &[ExpenseRecord],
        roster: &Roster,
        claimed: &AtomicBool,
    ) -> Result<SettlementReport> {
        let started = Instant::now();
        tracing::info!(
            expenses = expenses.len(),
            participants = roster.len(),
            "Starting settlement"
        );

        let outcome = self.compute_report(expenses, roster, claimed);
        if claimed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Discarding settlement that outlived its deadline");
            return Err(Error::Cancelled);
        }

        match outcome {
            Ok(report) => {
                let elapsed = started.elapsed();
                self.metrics.record_success(
                    report.settlements.len(),
                    report.transfer_count(),
                    elapsed.as_secs_f64(),
                );
                tracing::info!(
                    currencies = report.settlements.len(),
                    transfers = report.transfer_count(),
                    elapsed_us = elapsed.as_micros() as u64,
                    "Settlement complete"
                );
                Ok(report)
            }
            Err(e) => {
                self.metrics.record_failure();
                tracing::warn!(error = %e, "Settlement failed");
                Err(e)
            }
        }
    }

    fn compute_report(
        &self,
        expenses: &[ExpenseRecord],
        roster: &Roster,
        claimed: &AtomicBool,
    ) -> Result<SettlementReport> {
        let mut settlements = Vec::new();
        for (currency, currency_expenses) in group_by_currency(expenses) {
            settlements.push(self.settle_currency(currency, &currency_expenses, roster, claimed)?);
        }
        Ok(SettlementReport { settlements })
    }

    fn settle_currency(
        &self,
        currency: Currency,
        expenses: &[&ExpenseRecord],
        roster: &Roster,
        claimed: &AtomicBool,
    ) -> Result<CurrencySettlement> {
        let include_unpaid = self.config.netting.include_unpaid_expenses;
        let (included, excluded): (Vec<&ExpenseRecord>, Vec<&ExpenseRecord>) = expenses
            .iter()
            .copied()
            .partition(|expense| include_unpaid || expense.has_payer());

        for expense in &excluded {
            tracing::warn!(
                expense_id = %expense.id,
                %currency,
                "Excluding expense without a payer from settlement"
            );
        }

        let shares = included
            .iter()
            .map(|expense| {
                if claimed.load(Ordering::Acquire) {
                    return Err(Error::Cancelled);
                }
                self.splitter
                    .compute_shares(expense.total, &expense.policy, &expense.participants)
                    .map_err(Error::from)
            })
            .collect::<Result<Vec<Shares>>>()?;

        let balances = compute_balances(included.iter().copied().zip(shares.iter()), roster)?;
        let obligations = bilateral_obligations(included.iter().copied().zip(shares.iter()))?;
        let transfers = settle(&balances)?;
        verify_plan(&balances, &transfers)?;
        let stats = NettingStats::compute(&balances, &obligations, &transfers)?;

        tracing::debug!(
            %currency,
            expenses = included.len(),
            excluded = excluded.len(),
            transfers = transfers.len(),
            efficiency = stats.efficiency,
            "Currency settled"
        );

        Ok(CurrencySettlement {
            currency,
            expense_count: included.len(),
            excluded_unpaid: excluded.len(),
            balances,
            obligations,
            transfers,
            stats,
        })
    }
}

/// Group expenses by currency, preserving input order within each group
fn group_by_currency(expenses: &[ExpenseRecord]) -> BTreeMap<Currency, Vec<&ExpenseRecord>> {
    let mut by_currency: BTreeMap<Currency, Vec<&ExpenseRecord>> = BTreeMap::new();

    for expense in expenses {
        by_currency
            .entry(expense.currency)
            .or_default()
            .push(expense);
    }

    by_currency
}

#[cfg(test)]
mod tests {
    use super::*;
    use expense_ledger::{Money, ParticipantId, Transfer};

    fn ids(names: &[&str]) -> Vec<ParticipantId> {
        names.iter().map(|name| ParticipantId::new(*name)).collect()
    }

    fn engine() -> SettlementEngine {
        SettlementEngine::new(Config::default()).unwrap()
    }

    #[test]
    fn test_engine_creation() {
        let engine = engine();
        assert_eq!(engine.config().service_name, "expense-settlement");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = Config {
            request_timeout_ms: 0,
            ..Config::default()
        };
        assert!(matches!(SettlementEngine::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_trip_settlement() {
        let roster = Roster::from_ids(["A", "B", "C"]);
        let expenses = vec![
            ExpenseRecord::equal(Money::from_cents(9000), Some("A".into()), ids(&["A", "B", "C"])),
            ExpenseRecord::equal(Money::from_cents(3000), Some("B".into()), ids(&["A", "B", "C"])),
        ];

        let engine = engine();
        let report = engine.compute(&expenses, &roster).unwrap();
        let usd = report.for_currency(Currency::USD).unwrap();

        // A: +9000 - 4000, B: +3000 - 4000, C: -4000
        assert_eq!(usd.balances.get(&"A".into()), Some(Money::from_cents(5000)));
        assert_eq!(usd.balances.get(&"B".into()), Some(Money::from_cents(-1000)));
        assert_eq!(usd.balances.get(&"C".into()), Some(Money::from_cents(-4000)));

        assert_eq!(
            usd.transfers,
            vec![
                Transfer {
                    from: "C".into(),
                    to: "A".into(),
                    amount: Money::from_cents(4000),
                },
                Transfer {
                    from: "B".into(),
                    to: "A".into(),
                    amount: Money::from_cents(1000),
                },
            ]
        );
        assert_eq!(usd.expense_count, 2);
        assert_eq!(engine.metrics().plans_total.get(), 1);
        assert_eq!(engine.metrics().transfers_total.get(), 2);
        assert_eq!(engine.metrics().failures_total.get(), 0);
    }

    #[test]
    fn test_currencies_settled_separately() {
        let roster = Roster::from_ids(["A", "B"]);
        let expenses = vec![
            ExpenseRecord::equal(Money::from_cents(1000), Some("A".into()), ids(&["A", "B"]))
                .with_currency(Currency::EUR),
            ExpenseRecord::equal(Money::from_cents(600), Some("B".into()), ids(&["A", "B"])),
        ];

        let engine = engine();
        let report = engine.compute(&expenses, &roster).unwrap();

        assert_eq!(report.settlements.len(), 2);
        // Currency order, not input order
        assert_eq!(report.settlements[0].currency, Currency::USD);
        assert_eq!(report.settlements[1].currency, Currency::EUR);

        let eur = report.for_currency(Currency::EUR).unwrap();
        assert_eq!(eur.transfers[0].from, ParticipantId::new("B"));
        assert_eq!(eur.transfers[0].amount, Money::from_cents(500));

        let usd = report.for_currency(Currency::USD).unwrap();
        assert_eq!(usd.transfers[0].from, ParticipantId::new("A"));
        assert_eq!(usd.transfers[0].amount, Money::from_cents(300));

        assert_eq!(engine.metrics().plans_total.get(), 2);
        assert_eq!(engine.metrics().transfers_total.get(), 2);
    }

    #[test]
    fn test_unpaid_expenses_excluded_by_default() {
        let roster = Roster::from_ids(["A", "B"]);
        let expenses = vec![
            ExpenseRecord::equal(Money::from_cents(1000), Some("A".into()), ids(&["A", "B"])),
            ExpenseRecord::equal(Money::from_cents(400), None, ids(&["A", "B"])),
        ];

        let report = engine().compute(&expenses, &roster).unwrap();
        let usd = report.for_currency(Currency::USD).unwrap();

        assert_eq!(usd.expense_count, 1);
        assert_eq!(usd.excluded_unpaid, 1);
        assert_eq!(usd.transfers.len(), 1);
        assert_eq!(usd.transfers[0].amount, Money::from_cents(500));
    }

    #[test]
    fn test_unpaid_expenses_included_unbalance_the_group() {
        let roster = Roster::from_ids(["A", "B"]);
        let expenses = vec![
            ExpenseRecord::equal(Money::from_cents(1000), Some("A".into()), ids(&["A", "B"])),
            ExpenseRecord::equal(Money::from_cents(400), None, ids(&["A", "B"])),
        ];
        let mut config = Config::default();
        config.netting.include_unpaid_expenses = true;
        let engine = SettlementEngine::new(config).unwrap();

        match engine.compute(&expenses, &roster) {
            Err(Error::UnbalancedInput { residual }) => assert_eq!(residual, -400),
            other => panic!("expected UnbalancedInput, got {:?}", other),
        }
        assert_eq!(engine.metrics().failures_total.get(), 1);
    }

    #[test]
    fn test_split_errors_propagate() {
        let roster = Roster::from_ids(["A", "B"]);
        let expenses = vec![ExpenseRecord::equal(
            Money::from_cents(1000),
            Some("A".into()),
            Vec::new(),
        )];

        let result = engine().compute(&expenses, &roster);
        assert!(matches!(
            result,
            Err(Error::Ledger(expense_ledger::Error::EmptyParticipantSet))
        ));
    }

    #[test]
    fn test_roster_errors_propagate() {
        let roster = Roster::from_ids(["A"]);
        let expenses = vec![ExpenseRecord::equal(
            Money::from_cents(1000),
            Some("A".into()),
            ids(&["A", "B"]),
        )];

        let result = engine().compute(&expenses, &roster);
        assert!(matches!(
            result,
            Err(Error::Ledger(
                expense_ledger::Error::ParticipantNotInRoster { .. }
            ))
        ));
    }

    #[test]
    fn test_no_expenses() {
        let roster = Roster::from_ids(["A", "B"]);
        let report = engine().compute(&[], &roster).unwrap();
        assert!(report.settlements.is_empty());
        assert!(report.is_empty());
    }

    #[test]
    fn test_claimed_run_is_discarded() {
        let engine = engine();
        let roster = Roster::from_ids(["A", "B"]);
        let expenses = vec![ExpenseRecord::equal(
            Money::from_cents(1000),
            Some("A".into()),
            ids(&["A", "B"]),
        )];

        let result = engine.run(&expenses, &roster, &AtomicBool::new(true));

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(engine.metrics().plans_total.get(), 0);
        assert_eq!(engine.metrics().failures_total.get(), 0);
        assert_eq!(engine.metrics().plan_duration.get_sample_count(), 0);
    }

    #[tokio::test]
    async fn test_deadline_abandons_work() {
        let config = Config {
            request_timeout_ms: 1,
            ..Config::default()
        };
        let engine = Arc::new(SettlementEngine::new(config).unwrap());
        let names: Vec<String> = (0..300).map(|i| format!("p{:03}", i)).collect();
        let group: Vec<ParticipantId> = names.iter().map(|name| name.as_str().into()).collect();
        let roster = Roster::from_ids(names.iter().cloned());
        let expenses: Vec<ExpenseRecord> = (0..3000)
            .map(|i| {
                ExpenseRecord::equal(
                    Money::from_cents(10_000 + i as i64),
                    Some(group[i % group.len()].clone()),
                    group.clone(),
                )
            })
            .collect();

        let result = engine.compute_with_deadline(expenses, roster).await;
        assert!(matches!(result, Err(Error::Timeout(_))));

        // Give the abandoned task time to reach a checkpoint
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert_eq!(engine.metrics().failures_total.get(), 1);
        assert_eq!(engine.metrics().plans_total.get(), 0);
        assert_eq!(engine.metrics().plan_duration.get_sample_count(), 0);
    }

    #[tokio::test]
    async fn test_compute_with_deadline() {
        let engine = Arc::new(engine());
        let roster = Roster::from_ids(["A", "B", "C"]);
        let expenses = vec![ExpenseRecord::equal(
            Money::from_cents(1000),
            Some("A".into()),
            ids(&["A", "B", "C"]),
        )];

        let direct = engine.compute(&expenses, &roster).unwrap();
        let bounded = engine
            .compute_with_deadline(expenses, roster)
            .await
            .unwrap();

        assert_eq!(direct, bounded);
        assert_eq!(bounded.transfer_count(), 2);
        assert_eq!(engine.metrics().plans_total.get(), 2);
        assert_eq!(engine.metrics().failures_total.get(), 0);
    }
}
