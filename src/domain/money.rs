//! Money type
//!
//! Domain primitive for monetary values held as integer minor units plus a
//! currency tag. Decimal strings only exist at the API edge.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum absolute value accepted from the outside world (1 trillion major units)
const MAX_AMOUNT_MINOR: i64 = 100_000_000_000_000;

/// Supported ledger currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Brl,
    Usd,
    Eur,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Brl => "BRL",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    /// Number of decimal places of the minor unit
    pub fn minor_units(&self) -> u32 {
        2
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::Brl
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BRL" => Ok(Currency::Brl),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Errors that can occur when building or combining Money
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: Currency, right: Currency },

    #[error("Amount has too many decimal places (max {max}, got {got})")]
    TooManyDecimals { max: u32, got: u32 },

    #[error("Amount exceeds maximum allowed value")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

/// Money is an exact amount in minor units (cents) tagged with its currency.
///
/// Unlike item amounts, a Money value may be zero or negative: ledger net
/// totals go below zero whenever expenses exceed income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount_minor: i64,
    currency: Currency,
}

impl Money {
    pub fn new(amount_minor: i64, currency: Currency) -> Self {
        Self {
            amount_minor,
            currency,
        }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Parse a human decimal string such as `"1234.56"`.
    ///
    /// # Errors
    /// - `MoneyError::ParseError` if the string is not a decimal number
    /// - `MoneyError::TooManyDecimals` if it is more precise than the currency
    /// - `MoneyError::Overflow` if the absolute value exceeds 1 trillion
    pub fn parse_decimal(input: &str, currency: Currency) -> Result<Self, MoneyError> {
        let mut value = Decimal::from_str(input.trim())
            .map_err(|e| MoneyError::ParseError(format!("{input}: {e}")))?;

        let max_scale = currency.minor_units();
        if value.scale() > max_scale {
            return Err(MoneyError::TooManyDecimals {
                max: max_scale,
                got: value.scale(),
            });
        }

        value.rescale(max_scale);
        let minor = i64::try_from(value.mantissa()).map_err(|_| MoneyError::Overflow)?;
        if minor.abs() > MAX_AMOUNT_MINOR {
            return Err(MoneyError::Overflow);
        }

        Ok(Self::new(minor, currency))
    }

    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_positive(&self) -> bool {
        self.amount_minor > 0
    }

    pub fn is_zero(&self) -> bool {
        self.amount_minor == 0
    }

    /// Decimal view used when rendering at the API edge
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.amount_minor, self.currency.minor_units())
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        self.amount_minor
            .checked_add(other.amount_minor)
            .map(|sum| Money::new(sum, self.currency))
            .ok_or(MoneyError::Overflow)
    }

    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        self.amount_minor
            .checked_sub(other.amount_minor)
            .map(|diff| Money::new(diff, self.currency))
            .ok_or(MoneyError::Overflow)
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            });
        }
        Ok(())
    }
}

/// Renders the two-decimal form, e.g. `-100.00`
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.*}",
            self.currency.minor_units() as usize,
            self.to_decimal()
        )
    }
}
