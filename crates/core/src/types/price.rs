//! Type-safe price representation using decimal arithmetic.
//!
//! The backend stores prices with two decimal places and discounts as a
//! percentage in `0..=100`. The discounted unit price is
//! `price * (1 - discount / 100)`, rounded to two places.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Quantity;

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Apply a percentage discount.
    #[must_use]
    pub fn discounted(self, discount: Discount) -> Self {
        let factor = Decimal::ONE - discount.as_fraction();
        Self::new((self.amount * factor).round_dp(2), self.currency_code)
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn times(self, quantity: Quantity) -> Self {
        Self::new(
            self.amount * Decimal::from(quantity.get()),
            self.currency_code,
        )
    }

    /// Sum two prices.
    ///
    /// Returns `None` when the currencies differ.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        (self.currency_code == other.currency_code)
            .then(|| Self::new(self.amount + other.amount, self.currency_code))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:.2}",
            self.currency_code.symbol(),
            self.amount.round_dp(2)
        )
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }
}

/// Errors that can occur when constructing a [`Discount`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscountError {
    /// The percentage is below zero or above one hundred.
    #[error("discount must be between 0 and 100 percent (got {0})")]
    OutOfRange(Decimal),
}

/// A percentage discount in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Discount(Decimal);

impl Discount {
    /// No discount.
    pub const NONE: Self = Self(Decimal::ZERO);

    /// Create a discount from a percentage.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::OutOfRange`] if the percentage is negative or
    /// greater than 100.
    pub fn from_percent(percent: Decimal) -> Result<Self, DiscountError> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(DiscountError::OutOfRange(percent));
        }
        Ok(Self(percent))
    }

    /// The percentage value.
    #[must_use]
    pub const fn percent(self) -> Decimal {
        self.0
    }

    fn as_fraction(self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }
}

impl TryFrom<Decimal> for Discount {
    type Error = DiscountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::from_percent(value)
    }
}

impl From<Discount> for Decimal {
    fn from(discount: Discount) -> Self {
        discount.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use core::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_discounted_price() {
        let price = Price::new(dec("200.00"), CurrencyCode::INR);
        let discount = Discount::from_percent(dec("12.5")).unwrap();
        assert_eq!(price.discounted(discount).amount, dec("175.00"));
    }

    #[test]
    fn test_discount_none_keeps_price() {
        let price = Price::new(dec("19.99"), CurrencyCode::USD);
        assert_eq!(price.discounted(Discount::NONE), price);
    }

    #[test]
    fn test_discount_out_of_range() {
        assert!(Discount::from_percent(dec("-1")).is_err());
        assert!(Discount::from_percent(dec("100.01")).is_err());
        assert!(Discount::from_percent(dec("100")).is_ok());
    }

    #[test]
    fn test_discount_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Discount>("\"150\"").is_err());
        let discount: Discount = serde_json::from_str("\"10.00\"").unwrap();
        assert_eq!(discount.percent(), dec("10.00"));
    }

    #[test]
    fn test_times_and_sum() {
        let unit = Price::new(dec("2.50"), CurrencyCode::INR);
        let line = unit.times(Quantity::new(4).unwrap());
        assert_eq!(line.amount, dec("10.00"));

        let total = line.checked_add(unit).unwrap();
        assert_eq!(total.amount, dec("12.50"));

        let dollars = Price::new(dec("1"), CurrencyCode::USD);
        assert!(total.checked_add(dollars).is_none());
    }

    #[test]
    fn test_display() {
        let price = Price::new(dec("5"), CurrencyCode::INR);
        assert_eq!(price.to_string(), "₹5.00");
    }
}
