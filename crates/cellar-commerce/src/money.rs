//! Money type for the two course-price ledgers.
//!
//! Uses cents-based integer representation to avoid floating-point
//! precision issues. USD and UYU are independent ledgers: a course carries
//! a list price in each, and nothing in this crate ever converts between
//! them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Supported ledger currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    /// United States dollar.
    #[default]
    USD,
    /// Uruguayan peso.
    UYU,
}

impl Currency {
    /// Get the currency code (e.g., "USD").
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::UYU => "UYU",
        }
    }

    /// Get the currency symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "US$",
            Currency::UYU => "$U",
        }
    }

    /// Parse a currency code string.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_uppercase().as_str() {
            "USD" => Some(Currency::USD),
            "UYU" => Some(Currency::UYU),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A monetary value with currency.
///
/// Amounts are stored in cents. Arithmetic across currencies is a bug, not
/// a conversion: the checked operations return `None` on mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Money {
    /// Amount in cents.
    pub amount_cents: i64,
    /// The currency ledger this amount belongs to.
    pub currency: Currency,
}

impl Money {
    /// Create a new Money value from cents.
    pub fn new(amount_cents: i64, currency: Currency) -> Self {
        Self {
            amount_cents,
            currency,
        }
    }

    /// Create a zero amount in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Check if this is zero.
    pub fn is_zero(&self) -> bool {
        self.amount_cents == 0
    }

    /// Try to add another Money value, returning None if currencies don't match.
    pub fn try_add(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        Some(Money::new(
            self.amount_cents + other.amount_cents,
            self.currency,
        ))
    }

    /// Try to subtract another Money value.
    pub fn try_subtract(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        Some(Money::new(
            self.amount_cents - other.amount_cents,
            self.currency,
        ))
    }

    /// Subtract another Money value, flooring the result at zero.
    ///
    /// Returns None if currencies don't match.
    pub fn saturating_subtract(&self, other: &Money) -> Option<Money> {
        self.try_subtract(other)
            .map(|m| Money::new(m.amount_cents.max(0), m.currency))
    }

    /// Calculate an integer percentage of this amount, rounded half-up.
    ///
    /// ```
    /// use cellar_commerce::money::{Currency, Money};
    /// let price = Money::new(30000, Currency::USD);
    /// assert_eq!(price.percentage(20).amount_cents, 6000);
    /// ```
    pub fn percentage(&self, percent: u8) -> Money {
        let cents = (self.amount_cents * percent as i64 + 50) / 100;
        Money::new(cents, self.currency)
    }

    /// Format as a display string (e.g., "US$300.00").
    pub fn display(&self) -> String {
        format!(
            "{}{}.{:02}",
            self.currency.symbol(),
            self.amount_cents / 100,
            (self.amount_cents % 100).abs()
        )
    }
}

impl Add for Money {
    type Output = Money;

    /// # Panics
    /// Panics if currencies don't match. Use `try_add` for fallible addition.
    fn add(self, other: Money) -> Money {
        self.try_add(&other).expect("Currency mismatch in addition")
    }
}

impl Sub for Money {
    type Output = Money;

    /// # Panics
    /// Panics if currencies don't match. Use `try_subtract` for fallible subtraction.
    fn sub(self, other: Money) -> Money {
        self.try_subtract(&other)
            .expect("Currency mismatch in subtraction")
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}
