//! 金额匹配模块：从评论文本中识别货币金额，并进行合理性过滤。
//!
//! # Amount Matcher
//!
//! Runs every configured [`CurrencyRule`] over a piece of text and returns
//! each plausible `(amount, currency, excerpt)` it finds.
//!
//! Rules are independent: one text can yield several currencies, several
//! occurrences of the same currency, or the same number twice when two rules
//! overlap (a `€20 €` matches both euro rules). No deduplication is done.
//!
//! ## Plausibility
//!
//! A candidate is kept only if `0 < amount <= max_amount` for its rule and
//! the amount is outside the calendar-year band `1900..=2100`, so that
//! "$2024" in a comment about the year is not counted.
//!
//! ## Example
//!
//! ```rust
//! use donation_scan::config::CurrencyRule;
//! use donation_scan::matcher::AmountMatcher;
//!
//! let matcher = AmountMatcher::new(&CurrencyRule::defaults()).unwrap();
//! let found = matcher.find_amounts("donated $50 great stream!");
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].currency, "USD");
//! ```

use crate::config::CurrencyRule;
use crate::Result;
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Amounts in this range look like calendar years and are never counted.
pub const YEAR_BAND: RangeInclusive<i64> = 1900..=2100;

/// A candidate amount found in a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountMatch {
    pub amount: Decimal,
    pub currency: String,
    /// The matched substring, trimmed.
    pub excerpt: String,
}

#[derive(Debug, Clone)]
struct CompiledCurrencyRule {
    regex: Regex,
    currency: String,
    max_amount: Decimal,
}

/// Extracts currency amounts from free-form text.
#[derive(Debug, Clone)]
pub struct AmountMatcher {
    rules: Vec<CompiledCurrencyRule>,
}

impl AmountMatcher {
    /// Compile the given rules. Fails on the first invalid pattern.
    pub fn new(rules: &[CurrencyRule]) -> Result<Self> {
        let compiled = rules
            .iter()
            .map(|r| {
                Ok(CompiledCurrencyRule {
                    regex: r.compile()?,
                    currency: r.currency.clone(),
                    max_amount: r.max_amount,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules: compiled })
    }

    /// All plausible amounts in `text`, in rule order then position order.
    ///
    /// Never fails: a match whose number does not parse is dropped.
    pub fn find_amounts(&self, text: &str) -> Vec<AmountMatch> {
        let mut found = Vec::new();
        for rule in &self.rules {
            for caps in rule.regex.captures_iter(text) {
                let Some(amount) = extract_amount(&caps) else {
                    continue;
                };
                if !is_plausible(amount, rule.max_amount) {
                    continue;
                }
                let excerpt = caps
                    .get(0)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default();
                found.push(AmountMatch {
                    amount,
                    currency: rule.currency.clone(),
                    excerpt,
                });
            }
        }
        found
    }
}

/// The amount is read from the first capture group that took part in the match.
fn extract_amount(caps: &Captures<'_>) -> Option<Decimal> {
    let raw = caps
        .iter()
        .skip(1)
        .flatten()
        .map(|m| m.as_str())
        .find(|s| !s.is_empty())?;
    Decimal::from_str(raw).ok()
}

/// Apply the amount-range and year-exclusion checks.
pub fn is_plausible(amount: Decimal, max_amount: Decimal) -> bool {
    amount > Decimal::ZERO && amount <= max_amount && !looks_like_year(amount)
}

pub fn looks_like_year(amount: Decimal) -> bool {
    amount >= Decimal::from(*YEAR_BAND.start()) && amount <= Decimal::from(*YEAR_BAND.end())
}
