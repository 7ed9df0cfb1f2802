//! Type-safe price representation using decimal arithmetic.
//!
//! Catalog prices are stored as `NUMERIC(12,2)` in the currency's standard
//! unit (euros, not cents). Payment providers want integer minor units, so
//! [`Price::to_minor_units`] is the single place that conversion happens.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors produced when building or converting a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("price must not be negative")]
    Negative,
    #[error("price is not a number: {0}")]
    NotANumber(String),
    #[error("price is too large to charge")]
    Overflow,
}

/// A non-negative price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., euros, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for amounts below zero.
    pub fn new(amount: Decimal, currency_code: CurrencyCode) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self {
            amount,
            currency_code,
        })
    }

    /// Parse a user-entered amount such as `"9.99"` or `"12,50"`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::NotANumber`] if the input is not a decimal and
    /// [`PriceError::Negative`] if it is below zero.
    pub fn parse(input: &str, currency_code: CurrencyCode) -> Result<Self, PriceError> {
        let normalized = input.trim().replace(',', ".");
        let amount = Decimal::from_str(&normalized)
            .map_err(|_| PriceError::NotANumber(input.trim().to_string()))?;
        Self::new(amount, currency_code)
    }

    /// Amount in integer minor units, rounding half away from zero.
    ///
    /// `9.99` becomes `999`, `0.125` becomes `13`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Overflow`] if the result does not fit in `i64`.
    pub fn to_minor_units(&self) -> Result<i64, PriceError> {
        let scale = Decimal::from(self.currency_code.minor_unit_factor());
        self.amount
            .checked_mul(scale)
            .ok_or(PriceError::Overflow)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(PriceError::Overflow)
    }

    /// Human-readable amount, e.g. `9.99 €` or `$9.99`.
    #[must_use]
    pub fn display(&self) -> String {
        let amount = self.amount.round_dp(2);
        match self.currency_code {
            CurrencyCode::EUR => format!("{amount:.2} €"),
            code => format!("{}{amount:.2}", code.symbol()),
        }
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes accepted for checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    USD,
    #[default]
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Lowercase code as the Stripe API expects it.
    #[must_use]
    pub const fn stripe_code(&self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
        }
    }

    /// Number of minor units per standard unit. All supported currencies use cents.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub const fn minor_unit_factor(&self) -> i64 {
        100
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usd" => Ok(Self::USD),
            "eur" => Ok(Self::EUR),
            "gbp" => Ok(Self::GBP),
            "cad" => Ok(Self::CAD),
            "aud" => Ok(Self::AUD),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.stripe_code())
    }
}
