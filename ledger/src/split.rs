//! Split calculator
//!
//! Turns an expense total and a [`SplitPolicy`] into exact per-participant
//! shares. Every branch ends with a conservation check: the shares always
//! sum to the total, to the cent.
//!
//! # Remainder fixup
//!
//! ```text
//! Equal split of 1000 among [A, B, C]:
//!   base = 1000 / 3 = 333, leftover = 1
//!   A: 334, B: 333, C: 333
//! ```
//!
//! Leftover cents go to the first participants in the order supplied, so the
//! same input always yields the same output. Percentage splits round each
//! share half away from zero and then apply the same fixup; a negative
//! leftover removes cents from the first participants instead.

use crate::{
    config::Config,
    money::Money,
    types::{ParticipantId, Share, Shares, SplitPolicy},
    Error, Result,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{BTreeMap, HashSet};

/// Split calculator
#[derive(Debug, Clone)]
pub struct SplitCalculator {
    /// Allowed distance of the percentage total from 100
    percentage_tolerance: Decimal,
}

impl Default for SplitCalculator {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl SplitCalculator {
    /// Create new split calculator
    pub fn new(config: &Config) -> Self {
        Self {
            percentage_tolerance: config.percentage_tolerance,
        }
    }

    /// Compute each participant's share of `total`
    pub fn compute_shares(
        &self,
        total: Money,
        policy: &SplitPolicy,
        participants: &[ParticipantId],
    ) -> Result<Shares> {
        validate_participants(participants)?;

        let amounts = match policy {
            SplitPolicy::Equal => split_equal(total, participants.len()),
            SplitPolicy::ExactAmounts(amounts) => split_exact(total, amounts, participants)?,
            SplitPolicy::Percentages(percentages) => {
                self.split_percentages(total, percentages, participants)?
            }
        };

        let shares = participants
            .iter()
            .zip(amounts)
            .map(|(participant, amount)| {
                Ok(Share {
                    participant: participant.clone(),
                    amount: Money::try_from_i128(amount)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let shares = Shares::from_vec(shares);

        ensure_conserved(total, &shares)?;

        tracing::trace!(
            total = total.cents(),
            participants = participants.len(),
            "computed shares"
        );

        Ok(shares)
    }

    fn split_percentages(
        &self,
        total: Money,
        percentages: &BTreeMap<ParticipantId, Decimal>,
        participants: &[ParticipantId],
    ) -> Result<Vec<i128>> {
        ensure_known(percentages.keys(), participants)?;

        let hundred = Decimal::ONE_HUNDRED;
        for (participant, percentage) in percentages {
            if *percentage < Decimal::ZERO || *percentage > hundred {
                return Err(Error::InvalidPercentage {
                    participant: participant.clone(),
                    percentage: *percentage,
                });
            }
        }

        let sum: Decimal = percentages.values().copied().sum();
        if (sum - hundred).abs() > self.percentage_tolerance {
            return Err(Error::InvalidPercentageTotal { total: sum });
        }

        let total_decimal = Decimal::from(total.cents());
        let mut shares = Vec::with_capacity(participants.len());
        for participant in participants {
            let percentage = percentages.get(participant).copied().unwrap_or(Decimal::ZERO);
            let exact = total_decimal
                .checked_mul(percentage)
                .and_then(|scaled| scaled.checked_div(hundred))
                .ok_or_else(|| Error::Overflow(format!("{}% of {}", percentage, total)))?;
            let rounded = exact
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i128()
                .ok_or_else(|| Error::Overflow(format!("{}% of {}", percentage, total)))?;
            shares.push(rounded);
        }

        // Participants left out of the map hold 0% and never absorb rounding
        let leftover = i128::from(total.cents()) - shares.iter().sum::<i128>();
        let weighted = |participant: &ParticipantId| {
            percentages
                .get(participant)
                .is_some_and(|percentage| !percentage.is_zero())
        };
        if participants.iter().any(weighted) {
            let eligible: Vec<&mut i128> = shares
                .iter_mut()
                .zip(participants)
                .filter(|(_, participant)| weighted(*participant))
                .map(|(share, _)| share)
                .collect();
            distribute_leftover(eligible.into_iter(), leftover);
        } else {
            distribute_leftover(shares.iter_mut(), leftover);
        }
        Ok(shares)
    }
}

fn validate_participants(participants: &[ParticipantId]) -> Result<()> {
    if participants.is_empty() {
        return Err(Error::EmptyParticipantSet);
    }

    let mut seen = HashSet::with_capacity(participants.len());
    for participant in participants {
        if !seen.insert(participant) {
            return Err(Error::DuplicateParticipant {
                participant: participant.clone(),
            });
        }
    }
    Ok(())
}

fn ensure_known<'a>(
    referenced: impl Iterator<Item = &'a ParticipantId>,
    participants: &[ParticipantId],
) -> Result<()> {
    for participant in referenced {
        if !participants.contains(participant) {
            return Err(Error::UnknownParticipant {
                participant: participant.clone(),
            });
        }
    }
    Ok(())
}

fn split_equal(total: Money, count: usize) -> Vec<i128> {
    let total = i128::from(total.cents());
    let n = count as i128;
    let base = total.div_euclid(n);
    let mut shares = vec![base; count];
    distribute_leftover(shares.iter_mut(), total - base * n);
    shares
}

fn split_exact(
    total: Money,
    amounts: &BTreeMap<ParticipantId, Money>,
    participants: &[ParticipantId],
) -> Result<Vec<i128>> {
    ensure_known(amounts.keys(), participants)?;

    let supplied: i128 = amounts.values().map(|m| i128::from(m.cents())).sum();
    let discrepancy = i128::from(total.cents()) - supplied;
    if discrepancy != 0 {
        return Err(Error::SplitMismatch {
            discrepancy: Money::try_from_i128(discrepancy)?,
        });
    }

    Ok(participants
        .iter()
        .map(|participant| {
            amounts
                .get(participant)
                .map(|m| i128::from(m.cents()))
                .unwrap_or(0)
        })
        .collect())
}

/// Spread `leftover` cents over `shares`, first participants first.
///
/// Each share moves by `|leftover| / n` and the first `|leftover| % n`
/// shares by one more cent, in the direction of `leftover`.
fn distribute_leftover<'a>(shares: impl ExactSizeIterator<Item = &'a mut i128>, leftover: i128) {
    if shares.len() == 0 || leftover == 0 {
        return;
    }

    let n = shares.len() as i128;
    let sign = leftover.signum();
    let magnitude = leftover.abs();
    let per_share = magnitude / n;
    let extra = (magnitude % n) as usize;

    for (index, share) in shares.enumerate() {
        *share += sign * per_share;
        if index < extra {
            *share += sign;
        }
    }
}

fn ensure_conserved(total: Money, shares: &Shares) -> Result<()> {
    let sum = shares.total()?;
    if sum != total {
        return Err(Error::InvariantViolation(format!(
            "shares sum to {} but expense total is {}",
            sum, total
        )));
    }
    Ok(())
}
