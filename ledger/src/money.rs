//! Fixed-point money in integer minor units
//!
//! Every amount inside the engine is a whole number of cents. Division is
//! deliberately absent: splitting a total is the job of
//! [`SplitCalculator`](crate::split::SplitCalculator), which owns the
//! remainder policy.
//!
//! Conversions to and from decimal major units exist only for the
//! input/output boundary and round exactly once.

use crate::{types::Currency, Error, Result};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Signed amount in minor currency units (cents)
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero cents
    pub const ZERO: Money = Money(0);

    /// Create from a cent count
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Raw cent count
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// True when exactly zero
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// True when strictly positive
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// True when strictly negative
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Magnitude in cents; defined for every value including `i64::MIN`
    pub const fn unsigned_abs(self) -> u64 {
        self.0.unsigned_abs()
    }

    /// Addition that reports overflow instead of wrapping
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Subtraction that reports overflow instead of wrapping
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Narrow a wide intermediate sum back into `Money`
    pub fn try_from_i128(cents: i128) -> Result<Money> {
        i64::try_from(cents)
            .map(Money)
            .map_err(|_| Error::Overflow(format!("{} cents does not fit in Money", cents)))
    }

    /// Sum without intermediate overflow, failing only if the result does not fit
    pub fn checked_sum<I>(amounts: I) -> Result<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        let total: i128 = amounts.into_iter().map(|m| i128::from(m.0)).sum();
        Money::try_from_i128(total)
    }

    /// Convert a major-unit decimal (e.g. dollars) into cents.
    ///
    /// Rounds once, half away from zero, to the currency's minor units.
    pub fn from_major(amount: Decimal, currency: Currency) -> Result<Money> {
        let scaled = amount
            .checked_mul(Decimal::from(currency.minor_scale()))
            .ok_or_else(|| Error::Overflow(format!("{} {} is too large", amount, currency)))?;
        let rounded = scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        rounded
            .to_i64()
            .map(Money)
            .ok_or_else(|| Error::Overflow(format!("{} {} is too large", amount, currency)))
    }

    /// Convert a floating-point major amount coming from a UI into cents
    pub fn from_major_f64(amount: f64, currency: Currency) -> Result<Money> {
        let decimal = Decimal::from_f64(amount)
            .ok_or_else(|| Error::InvalidAmount(format!("{} is not a finite amount", amount)))?;
        Money::from_major(decimal, currency)
    }

    /// Parse a decimal string such as `"12.34"` or `"-0,5"` from a form.
    ///
    /// Rejects more fractional digits than the currency allows rather than
    /// rounding user input.
    pub fn parse_major(input: &str, currency: Currency) -> Result<Money> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidAmount("empty amount".to_string()));
        }

        let normalized = trimmed.replace(',', ".");
        let decimal: Decimal = normalized
            .parse()
            .map_err(|_| Error::InvalidAmount(format!("'{}' is not a number", trimmed)))?;

        if decimal.normalize().scale() > currency.minor_units() {
            return Err(Error::InvalidAmount(format!(
                "'{}' has more than {} decimal places",
                trimmed,
                currency.minor_units()
            )));
        }

        Money::from_major(decimal, currency)
    }

    /// Major-unit decimal for display
    pub fn to_major(self, currency: Currency) -> Decimal {
        Decimal::new(self.0, currency.minor_units())
    }

    /// Format as `<amount> <CODE>`, e.g. `-12.34 EUR`
    pub fn format(self, currency: Currency) -> String {
        format!("{} {}", self.to_major(currency), currency.code())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}
