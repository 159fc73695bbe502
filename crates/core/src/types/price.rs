//! Strictly positive money amounts using decimal arithmetic.
//!
//! The store sells in a single currency, so a price is just an amount.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceError {
    /// Zero or negative amount.
    #[error("price must be greater than zero (got {0})")]
    NotPositive(Decimal),
    /// Fractions of a cent.
    #[error("price must have at most {MAX_SCALE} decimal places (got {0})")]
    TooPrecise(Decimal),
    /// Larger than a stored amount can hold.
    #[error("price must be less than 10000000000 (got {0})")]
    TooLarge(Decimal),
}

/// Digits after the decimal point a stored amount keeps.
pub const MAX_SCALE: u32 = 2;

/// Exclusive upper bound of a stored amount (`NUMERIC(12, 2)`).
const LIMIT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// A strictly positive amount of money.
///
/// Used for kit prices, the crossed-out `original_price` of a kit on sale,
/// the unit price snapshot on an order line and the order total.
///
/// ```
/// use circuit_sphere_core::Price;
/// use rust_decimal::Decimal;
///
/// let price = Price::new(Decimal::new(4999, 2)).unwrap();
/// assert_eq!(price.to_string(), "49.99");
/// assert!(Price::new(Decimal::ZERO).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Create a price in whole cents below ten billion.
    ///
    /// Trailing zeros do not count towards the scale, so `19.900` is
    /// accepted as `19.90`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::NotPositive`] if `amount <= 0`,
    /// [`PriceError::TooPrecise`] for fractions of a cent and
    /// [`PriceError::TooLarge`] at or above `10^10`.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive(amount));
        }
        if amount.normalize().scale() > MAX_SCALE {
            return Err(PriceError::TooPrecise(amount));
        }
        if amount >= LIMIT {
            return Err(PriceError::TooLarge(amount));
        }
        Ok(Self(amount))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Amount multiplied by a line quantity, `None` on overflow.
    #[must_use]
    pub fn checked_times(self, quantity: u32) -> Option<Decimal> {
        self.0.checked_mul(Decimal::from(quantity))
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
