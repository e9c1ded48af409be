//! Line item quantity.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// Quantity was zero.
    #[error("quantity must be at least 1")]
    Zero,
    /// Quantity was negative or does not fit in a `u32`.
    #[error("quantity {0} is out of range")]
    OutOfRange(i64),
    /// Input was not a whole number.
    #[error("quantity must be a whole number")]
    NotANumber,
}

/// A positive number of units of a product.
///
/// A line item with zero units does not exist, so zero is unrepresentable
/// here; setting a line to zero is expressed as removing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Zero`] for zero.
    pub fn new(value: u32) -> Result<Self, QuantityError> {
        NonZeroU32::new(value).map(Self).ok_or(QuantityError::Zero)
    }

    /// The number of units.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Add two quantities, saturating at `u32::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0.get()))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        let value = u32::try_from(value).map_err(|_| QuantityError::OutOfRange(value))?;
        Self::new(value)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

impl core::str::FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|_| QuantityError::NotANumber)?;
        Self::try_from(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_rejected() {
        assert_eq!(Quantity::new(0), Err(QuantityError::Zero));
        assert!(serde_json::from_str::<Quantity>("0").is_err());
    }

    #[test]
    fn test_negative_is_rejected() {
        assert_eq!(
            Quantity::try_from(-3_i64),
            Err(QuantityError::OutOfRange(-3))
        );
    }

    #[test]
    fn test_saturating_add() {
        let two = Quantity::new(2).unwrap();
        assert_eq!(two.saturating_add(two).get(), 4);

        let max = Quantity::new(u32::MAX).unwrap();
        assert_eq!(max.saturating_add(two).get(), u32::MAX);
    }

    #[test]
    fn test_serde() {
        let quantity: Quantity = serde_json::from_str("3").unwrap();
        assert_eq!(quantity.get(), 3);
        assert_eq!(serde_json::to_string(&quantity).unwrap(), "3");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("5".parse::<Quantity>().unwrap().get(), 5);
        assert!("0".parse::<Quantity>().is_err());
        assert!("x".parse::<Quantity>().is_err());
    }
}
