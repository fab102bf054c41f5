//! Balance aggregation
//!
//! Folds split expenses into one net balance per roster member:
//!
//! ```text
//! net = Σ(totals paid) - Σ(shares owed)
//! ```
//!
//! # Conservation
//!
//! When every expense has a payer the resulting sheet sums to exactly zero.
//! An expense without a payer is a pure debit (pre-paid or untracked), so a
//! sheet that includes one sums to minus that expense's total. Callers that
//! need whole-group conservation must leave such expenses out.

use crate::{
    money::Money,
    types::{BalanceSheet, Currency, ExpenseRecord, ParticipantId, Roster, Shares},
    Error, Result,
};

/// Compute net balances for every roster member.
///
/// Fails as a whole if any payer or share recipient is missing from the
/// roster; a partial sheet would misstate everyone else's balance.
pub fn compute_balances<'a, I>(expenses: I, roster: &Roster) -> Result<BalanceSheet>
where
    I: IntoIterator<Item = (&'a ExpenseRecord, &'a Shares)>,
{
    let mut sheet = BalanceSheet::zeroed(roster);
    let mut currency: Option<Currency> = None;
    let mut count = 0usize;

    for (expense, shares) in expenses {
        match currency {
            None => currency = Some(expense.currency),
            Some(expected) if expected != expense.currency => {
                return Err(Error::CurrencyMismatch {
                    expected,
                    found: expense.currency,
                });
            }
            Some(_) => {}
        }

        if let Some(payer) = &expense.payer {
            ensure_in_roster(payer, expense, roster)?;
            sheet.adjust(payer, expense.total)?;
        }

        for share in shares.iter() {
            ensure_in_roster(&share.participant, expense, roster)?;
            let debit = Money::ZERO.checked_sub(share.amount).ok_or_else(|| {
                Error::Overflow(format!("share of {} cannot be negated", share.participant))
            })?;
            sheet.adjust(&share.participant, debit)?;
        }

        count += 1;
    }

    tracing::debug!(
        expenses = count,
        participants = sheet.len(),
        residual = %sheet.total(),
        "aggregated balances"
    );

    Ok(sheet)
}

fn ensure_in_roster(
    participant: &ParticipantId,
    expense: &ExpenseRecord,
    roster: &Roster,
) -> Result<()> {
    if roster.contains(participant) {
        Ok(())
    } else {
        Err(Error::ParticipantNotInRoster {
            participant: participant.clone(),
            expense_id: expense.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::SplitCalculator;

    fn ids(names: &[&str]) -> Vec<ParticipantId> {
        names.iter().map(|name| ParticipantId::new(*name)).collect()
    }

    fn split(expense: &ExpenseRecord) -> Shares {
        SplitCalculator::default()
            .compute_shares(expense.total, &expense.policy, &expense.participants)
            .unwrap()
    }

    #[test]
    fn test_single_expense() {
        let roster = Roster::from_ids(["A", "B", "C"]);
        let dinner = ExpenseRecord::equal(
            Money::from_cents(900),
            Some("A".into()),
            ids(&["A", "B", "C"]),
        );
        let shares = split(&dinner);

        let sheet = compute_balances([(&dinner, &shares)], &roster).unwrap();

        assert_eq!(sheet.get(&"A".into()), Some(Money::from_cents(600)));
        assert_eq!(sheet.get(&"B".into()), Some(Money::from_cents(-300)));
        assert_eq!(sheet.get(&"C".into()), Some(Money::from_cents(-300)));
        assert_eq!(sheet.total(), 0);
    }

    #[test]
    fn test_roster_members_without_expenses_are_zero() {
        let roster = Roster::from_ids(["A", "B", "D"]);
        let taxi = ExpenseRecord::equal(Money::from_cents(100), Some("B".into()), ids(&["A", "B"]));
        let shares = split(&taxi);

        let sheet = compute_balances([(&taxi, &shares)], &roster).unwrap();

        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet.get(&"D".into()), Some(Money::ZERO));
        assert_eq!(sheet.nonzero_count(), 2);
    }

    #[test]
    fn test_multiple_expenses_accumulate() {
        let roster = Roster::from_ids(["A", "B", "C"]);
        let first = ExpenseRecord::equal(
            Money::from_cents(1000),
            Some("A".into()),
            ids(&["A", "B", "C"]),
        );
        let second = ExpenseRecord::equal(Money::from_cents(500), Some("B".into()), ids(&["B", "C"]));
        let first_shares = split(&first);
        let second_shares = split(&second);

        let sheet = compute_balances(
            [(&first, &first_shares), (&second, &second_shares)],
            &roster,
        )
        .unwrap();

        // A: +1000 - 334, B: +500 - 333 - 250, C: -333 - 250
        assert_eq!(sheet.get(&"A".into()), Some(Money::from_cents(666)));
        assert_eq!(sheet.get(&"B".into()), Some(Money::from_cents(-83)));
        assert_eq!(sheet.get(&"C".into()), Some(Money::from_cents(-583)));
        assert_eq!(sheet.total(), 0);
    }

    #[test]
    fn test_unpaid_expense_is_pure_debit() {
        let roster = Roster::from_ids(["A", "B"]);
        let prepaid = ExpenseRecord::equal(Money::from_cents(400), None, ids(&["A", "B"]));
        let shares = split(&prepaid);

        let sheet = compute_balances([(&prepaid, &shares)], &roster).unwrap();

        assert_eq!(sheet.get(&"A".into()), Some(Money::from_cents(-200)));
        assert_eq!(sheet.total(), -400);
    }

    #[test]
    fn test_payer_outside_roster() {
        let roster = Roster::from_ids(["A", "B"]);
        let expense = ExpenseRecord::equal(Money::from_cents(100), Some("Z".into()), ids(&["A", "B"]));
        let shares = split(&expense);

        let result = compute_balances([(&expense, &shares)], &roster);
        assert_eq!(
            result,
            Err(Error::ParticipantNotInRoster {
                participant: "Z".into(),
                expense_id: expense.id,
            })
        );
    }

    #[test]
    fn test_share_recipient_outside_roster() {
        let roster = Roster::from_ids(["A", "B"]);
        let expense = ExpenseRecord::equal(
            Money::from_cents(100),
            Some("A".into()),
            ids(&["A", "B", "C"]),
        );
        let shares = split(&expense);

        let result = compute_balances([(&expense, &shares)], &roster);
        assert!(matches!(result, Err(Error::ParticipantNotInRoster { .. })));
    }

    #[test]
    fn test_mixed_currencies_rejected() {
        let roster = Roster::from_ids(["A", "B"]);
        let usd = ExpenseRecord::equal(Money::from_cents(100), Some("A".into()), ids(&["A", "B"]));
        let eur = usd.clone().with_currency(Currency::EUR);
        let usd_shares = split(&usd);
        let eur_shares = split(&eur);

        let result = compute_balances([(&usd, &usd_shares), (&eur, &eur_shares)], &roster);
        assert_eq!(
            result,
            Err(Error::CurrencyMismatch {
                expected: Currency::USD,
                found: Currency::EUR,
            })
        );
    }

    #[test]
    fn test_empty_expense_list() {
        let roster = Roster::from_ids(["A"]);
        let expenses = std::iter::empty::<(&ExpenseRecord, &Shares)>();
        let sheet = compute_balances(expenses, &roster).unwrap();
        assert!(sheet.is_settled());
    }
}
