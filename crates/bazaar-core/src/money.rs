//! # Money Module
//!
//! Prices are whole numbers of cents. Nothing in the system ever touches a
//! floating point amount; the only conversion is [`MoneyInCents`]'s
//! `Display`, which renders the decimal notation used on labels and exports.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Where prices live                                                      │
//! │                                                                         │
//! │  Item.price_in_cents ──► sale totals (SUM over sale_items)             │
//! │          │                                                              │
//! │          └──► "12.50" on the printed label                             │
//! │                                                                         │
//! │  Rule: an item price is always > 0 (donations still carry a price)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use ts_rs::TS;

/// An amount in cents.
///
/// Serialises as a bare integer so the wire format stays `"priceInCents": 1250`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct MoneyInCents(i64);

impl MoneyInCents {
    /// Creates an amount from cents.
    ///
    /// ```rust
    /// use bazaar_core::MoneyInCents;
    ///
    /// let price = MoneyInCents::from_cents(1250);
    /// assert_eq!(price.cents(), 1250);
    /// assert_eq!(price.to_string(), "12.50");
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        MoneyInCents(cents)
    }

    /// Returns the amount in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        MoneyInCents(0)
    }

    /// Whether this amount is acceptable as an item price.
    #[inline]
    pub const fn is_valid_price(&self) -> bool {
        self.0 > 0
    }
}

impl From<i64> for MoneyInCents {
    fn from(cents: i64) -> Self {
        MoneyInCents(cents)
    }
}

impl Add for MoneyInCents {
    type Output = MoneyInCents;

    fn add(self, rhs: MoneyInCents) -> MoneyInCents {
        MoneyInCents(self.0 + rhs.0)
    }
}

impl Sum for MoneyInCents {
    fn sum<I: Iterator<Item = MoneyInCents>>(iter: I) -> Self {
        iter.fold(MoneyInCents::zero(), Add::add)
    }
}

/// Decimal notation with exactly two fraction digits.
impl fmt::Display for MoneyInCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(MoneyInCents::from_cents(1250).to_string(), "12.50");
        assert_eq!(MoneyInCents::from_cents(5).to_string(), "0.05");
        assert_eq!(MoneyInCents::from_cents(0).to_string(), "0.00");
        assert_eq!(MoneyInCents::from_cents(-150).to_string(), "-1.50");
    }

    #[test]
    fn test_valid_price() {
        assert!(MoneyInCents::from_cents(1).is_valid_price());
        assert!(!MoneyInCents::from_cents(0).is_valid_price());
        assert!(!MoneyInCents::from_cents(-100).is_valid_price());
    }

    #[test]
    fn test_sum() {
        let total: MoneyInCents = [100, 250, 1000]
            .into_iter()
            .map(MoneyInCents::from_cents)
            .sum();
        assert_eq!(total.cents(), 1350);
    }

    #[test]
    fn test_serializes_as_integer() {
        let json = serde_json::to_string(&MoneyInCents::from_cents(999)).unwrap();
        assert_eq!(json, "999");
    }
}
