//! Currency extraction rules

use crate::{Error, ErrorContext, Result};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One way of recognizing an amount in a given currency.
///
/// The pattern must anchor on the currency's symbol or keyword; the amount
/// is read from the first capture group that participated in the match, so a
/// pattern may offer several alternatives with one group each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRule {
    pub pattern: String,
    pub currency: String,
    /// Largest amount still considered a plausible donation.
    pub max_amount: Decimal,
    /// Symbol used when rendering amounts of this currency.
    pub symbol: String,
}

impl CurrencyRule {
    pub fn new(
        pattern: impl Into<String>,
        currency: impl Into<String>,
        max_amount: Decimal,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            currency: currency.into(),
            max_amount,
            symbol: symbol.into(),
        }
    }

    /// Compile the pattern. Symbols match exactly; keywords opt into
    /// case-insensitivity with a scoped `(?i:...)` group.
    pub fn compile(&self) -> Result<Regex> {
        Regex::new(&self.pattern).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid pattern for {}", self.currency),
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("currency_rule"),
            )
        })
    }

    /// US dollars: `$N`, optionally preceded by a donation keyword.
    pub fn usd() -> Self {
        Self::new(
            r"\b(?i:donated?|sent|giving|gave|sending|paid|tipped|supporting|here's)\s+\$(\d+(?:\.\d{1,2})?)(?:\s|$)|\$(\d+(?:\.\d+)?)(?:\s|$)",
            "USD",
            Decimal::from(10_000),
            "$",
        )
    }

    /// Indian rupees: `₹N` or `rs.N`, optionally preceded by a donation keyword.
    pub fn inr() -> Self {
        Self::new(
            r"\b(?i:donated?|sent|giving|gave|sending|paid|tipped|supporting|here's)\s+(?:₹|(?i:rs\.)\s?)(\d+(?:\.\d{1,2})?)(?:\s|$)|(?:₹|\b(?i:rs\.)\s?)(\d+(?:\.\d+)?)(?:\s|$)",
            "INR",
            Decimal::from(100_000),
            "₹",
        )
    }

    /// Euros written with a leading symbol: `€N`.
    pub fn eur_prefix() -> Self {
        Self::new(
            r"€(\d+(?:\.\d+)?)(?:\s|$)",
            "EUR",
            Decimal::from(10_000),
            "€",
        )
    }

    /// Euros written with a trailing symbol: `N€` or `N €`, any spacing.
    pub fn eur_suffix() -> Self {
        Self::new(
            r"\b(\d+(?:\.\d+)?)\s*€(?:\s|$)",
            "EUR",
            Decimal::from(10_000),
            "€",
        )
    }

    /// The built-in rule set.
    pub fn defaults() -> Vec<Self> {
        vec![Self::usd(), Self::inr(), Self::eur_prefix(), Self::eur_suffix()]
    }
}
