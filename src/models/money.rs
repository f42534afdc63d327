use std::fmt;
use std::ops::{Add, Mul};

use serde::{Deserialize, Serialize};

/// Largest accepted price, in major units.
const MAX_MAJOR_UNITS: f64 = 999_999.0;

/// An amount in minor currency units (1/100 of a yuan).
///
/// Prices, surcharges and totals all travel as `Money` so a major-unit value
/// can never be mixed into a minor-unit computation by accident. On the wire
/// it is a bare integer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MoneyError {
    #[error("price must not be empty")]
    Empty,

    #[error("invalid price format: {0}")]
    Invalid(String),

    #[error("price must not be negative")]
    Negative,

    #[error("price must not exceed 999,999")]
    TooLarge,
}

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest price a package may carry.
    pub const MAX: Money = Money(99_999_900);

    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Checks an amount given directly in minor units against the same
    /// bounds as [`Money::parse`].
    pub fn try_from_minor(minor: i64) -> Result<Self, MoneyError> {
        if minor < 0 {
            return Err(MoneyError::Negative);
        }
        if minor > Money::MAX.0 {
            return Err(MoneyError::TooLarge);
        }
        Ok(Money(minor))
    }

    /// Parses a human-entered major-unit price such as `"¥1,234.50"` or
    /// `"99.9"` into minor units, rounding to the nearest unit.
    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        let cleaned: String = input
            .chars()
            .filter(|c| !matches!(c, '¥' | '$' | ',') && !c.is_whitespace())
            .collect();
        if cleaned.is_empty() {
            return Err(MoneyError::Empty);
        }

        let major: f64 = cleaned
            .parse()
            .map_err(|_| MoneyError::Invalid(input.to_string()))?;
        if !major.is_finite() {
            return Err(MoneyError::Invalid(input.to_string()));
        }
        if major < 0.0 {
            return Err(MoneyError::Negative);
        }
        if major > MAX_MAJOR_UNITS {
            return Err(MoneyError::TooLarge);
        }

        Ok(Money((major * 100.0).round() as i64))
    }
}

// Arithmetic saturates: totals of absurd inputs pin at `i64::MAX`.
impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, rhs: i64) -> Money {
        Money(self.0.saturating_mul(rhs))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minor = self.0.max(0);
        write!(f, "¥{}.{:02}", minor / 100, minor % 100)
    }
}
