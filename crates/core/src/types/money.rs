//! Decimal money amounts as reported by the bookstore API.
//!
//! The API serializes decimal fields as strings (`"12.50"`) but computed
//! totals as plain JSON numbers. `Money` accepts both and always displays
//! with two decimal places. There is a single store currency, so no
//! currency code is carried.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A monetary amount in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a money amount from a decimal.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a money amount from an integer number of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price for `quantity` units of this unit price.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Apply a percentage discount (`20` means 20% off), rounded to cents.
    #[must_use]
    pub fn discounted_by_percent(self, percent: Decimal) -> Self {
        let factor = (Decimal::ONE_HUNDRED - percent) / Decimal::ONE_HUNDRED;
        Self((self.0 * factor).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if rounded.is_sign_negative() && !rounded.is_zero() {
            write!(f, "-${:.2}", rounded.abs())
        } else {
            write!(f, "${:.2}", rounded.abs())
        }
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self::Output {
        self.times(rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_deserialize_from_string_and_number() {
        let from_str: Money = serde_json::from_str("\"12.50\"").unwrap();
        let from_num: Money = serde_json::from_str("12.5").unwrap();
        assert_eq!(from_str, from_num);
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Money::from_cents(1250).to_string(), "$12.50");
        assert_eq!(Money::ZERO.to_string(), "$0.00");
        assert_eq!(Money::from_cents(-399).to_string(), "-$3.99");
    }

    #[test]
    fn test_times_and_sum() {
        let unit = Money::from_cents(999);
        assert_eq!(unit.times(3), Money::from_cents(2997));

        let total: Money = [Money::from_cents(100), Money::from_cents(250)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_cents(350));
    }

    #[test]
    fn test_discounted_by_percent_rounds_to_cents() {
        let price = Money::new(Decimal::from_str("19.99").unwrap());
        let discounted = price.discounted_by_percent(Decimal::from(15));
        assert_eq!(discounted, Money::new(Decimal::from_str("16.99").unwrap()));
    }
}
