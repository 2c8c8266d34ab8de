//! 汇率模块：获取实时汇率，失败时回退到配置中的固定汇率表。
//!
//! # Rate Provider
//!
//! One HTTP GET per run against a JSON endpoint shaped like
//!
//! ```json
//! { "result": "success", "rates": { "USD": 1, "INR": 83.1, "EUR": 0.92 } }
//! ```
//!
//! Rates are "units of that currency per one unit of the reference currency",
//! so converting an amount means dividing by its rate. A response quoted
//! against another base is rebased by dividing every rate by the reference
//! currency's own rate, so the reference code must be in the response.
//!
//! | Condition | Table returned |
//! |-----------|----------------|
//! | `result == "success"`, reference and every rule currency present | [`RateSource::Live`] |
//! | network error, timeout, non-2xx status | [`RateSource::Fallback`] |
//! | body not JSON, `result` not `"success"` | [`RateSource::Fallback`] |
//! | the reference or a required currency missing | [`RateSource::Fallback`] |
//!
//! [`RateProvider::fetch_rates`] never fails; the failure is logged at warn
//! level and the fallback table is used.

use crate::config::AnalyzerConfig;
use crate::{Error, ErrorContext, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Where a [`RateTable`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    Live,
    Fallback,
}

/// Exchange rates against one reference currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateTable {
    reference: String,
    rates: BTreeMap<String, Decimal>,
    source: RateSource,
}

impl RateTable {
    /// The reference currency always maps to 1, whatever `rates` says.
    pub fn new(
        reference: impl Into<String>,
        mut rates: BTreeMap<String, Decimal>,
        source: RateSource,
    ) -> Self {
        let reference = reference.into();
        rates.insert(reference.clone(), Decimal::ONE);
        Self {
            reference,
            rates,
            source,
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn source(&self) -> RateSource {
        self.source
    }

    pub fn rates(&self) -> &BTreeMap<String, Decimal> {
        &self.rates
    }

    pub fn rate(&self, currency: &str) -> Option<Decimal> {
        self.rates.get(currency).copied()
    }

    /// Convert `amount` of `currency` into the reference currency.
    ///
    /// `None` when there is no usable (positive) rate for `currency`.
    pub fn to_reference(&self, amount: Decimal, currency: &str) -> Option<Decimal> {
        if currency == self.reference {
            return Some(amount);
        }
        let rate = self.rate(currency).filter(|r| *r > Decimal::ZERO)?;
        amount.checked_div(rate)
    }
}

#[derive(Debug, Deserialize)]
struct RateResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    rates: BTreeMap<String, f64>,
}

/// Fetches live rates and falls back to a fixed table.
#[derive(Debug, Clone)]
pub struct RateProvider {
    http: reqwest::Client,
    required: Vec<String>,
    fallback: BTreeMap<String, Decimal>,
}

impl RateProvider {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.rate_request_timeout_duration())
            .build()
            .map_err(|e| {
                Error::configuration_with_context(
                    "failed to build HTTP client for exchange rates",
                    ErrorContext::new()
                        .with_details(e.to_string())
                        .with_source("rate_provider"),
                )
            })?;
        Ok(Self {
            http,
            required: config.rule_currencies(),
            fallback: config.fallback_rates.clone(),
        })
    }

    /// Codes that a live response must contain to be accepted.
    pub fn required_currencies(&self) -> &[String] {
        &self.required
    }

    /// Fetch rates from `source_url`, or return the fallback table.
    pub async fn fetch_rates(&self, reference_currency: &str, source_url: &str) -> RateTable {
        match self.try_fetch(reference_currency, source_url).await {
            Ok(table) => {
                debug!(
                    url = source_url,
                    currencies = table.rates().len(),
                    "fetched live exchange rates"
                );
                table
            }
            Err(e) => {
                warn!(url = source_url, error = %e, "could not fetch live rates, using fallback rates");
                self.fallback_table(reference_currency)
            }
        }
    }

    async fn try_fetch(&self, reference_currency: &str, source_url: &str) -> Result<RateTable> {
        let response = self.http.get(source_url).send().await.map_err(|e| {
            fetch_error(source_url, format!("HTTP request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(fetch_error(source_url, format!("HTTP {}", response.status())));
        }

        let body: RateResponse = response
            .json()
            .await
            .map_err(|e| fetch_error(source_url, format!("unreadable rate response: {}", e)))?;

        if body.result.as_deref() != Some("success") {
            return Err(Error::rate_fetch_with_context(
                "rate source did not report success",
                ErrorContext::new()
                    .with_field_path("result")
                    .with_details(format!("got {:?}", body.result))
                    .with_source(source_url),
            ));
        }

        let mut rates = BTreeMap::new();
        for (code, value) in body.rates {
            match Decimal::try_from(value) {
                Ok(rate) if rate > Decimal::ZERO => {
                    rates.insert(code, rate);
                }
                _ => debug!(currency = %code, value, "ignoring unusable rate"),
            }
        }

        let Some(rates) = rebase(&rates, reference_currency) else {
            return Err(Error::rate_fetch_with_context(
                "rate source has no rate for the reference currency",
                ErrorContext::new()
                    .with_field_path(format!("rates.{}", reference_currency))
                    .with_source(source_url),
            ));
        };

        if let Some(missing) = self.required.iter().find(|code| !rates.contains_key(*code)) {
            return Err(Error::rate_fetch_with_context(
                "rate source is missing a required currency",
                ErrorContext::new()
                    .with_field_path(format!("rates.{}", missing))
                    .with_source(source_url),
            ));
        }

        Ok(RateTable::new(reference_currency, rates, RateSource::Live))
    }

    /// The configured fallback table, rebased onto `reference_currency`.
    ///
    /// Fallback rates are quoted per US dollar. For another reference that
    /// the table knows, every rate is divided by the reference's own rate.
    pub fn fallback_table(&self, reference_currency: &str) -> RateTable {
        let rates = rebase(&self.fallback, reference_currency).unwrap_or_else(|| self.fallback.clone());
        RateTable::new(reference_currency, rates, RateSource::Fallback)
    }
}

/// Re-quote `rates` per one unit of `reference`.
///
/// `None` when `reference` has no positive rate in the table.
fn rebase(rates: &BTreeMap<String, Decimal>, reference: &str) -> Option<BTreeMap<String, Decimal>> {
    let base = rates.get(reference).copied().filter(|r| *r > Decimal::ZERO)?;
    if base == Decimal::ONE {
        return Some(rates.clone());
    }
    Some(
        rates
            .iter()
            .filter_map(|(code, rate)| rate.checked_div(base).map(|r| (code.clone(), r)))
            .collect(),
    )
}

fn fetch_error(url: &str, details: String) -> Error {
    Error::rate_fetch_with_context(
        "exchange rate request failed",
        ErrorContext::new()
            .with_details(details)
            .with_source(url),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn provider() -> RateProvider {
        RateProvider::new(&AnalyzerConfig::default()).unwrap()
    }

    #[test]
    fn test_reference_maps_to_one() {
        let table = RateTable::new("USD", BTreeMap::new(), RateSource::Live);
        assert_eq!(table.rate("USD"), Some(Decimal::ONE));
        assert_eq!(table.to_reference(dec!(12.5), "USD"), Some(dec!(12.5)));
    }

    #[test]
    fn test_to_reference_divides_by_rate() {
        let rates = BTreeMap::from([("INR".to_string(), dec!(80))]);
        let table = RateTable::new("USD", rates, RateSource::Live);
        assert_eq!(table.to_reference(dec!(400), "INR"), Some(dec!(5)));
        assert_eq!(table.to_reference(dec!(400), "JPY"), None);
    }

    #[test]
    fn test_zero_rate_is_unusable() {
        let rates = BTreeMap::from([("XXX".to_string(), Decimal::ZERO)]);
        let table = RateTable::new("USD", rates, RateSource::Live);
        assert_eq!(table.to_reference(dec!(1), "XXX"), None);
    }

    #[test]
    fn test_fallback_table_in_usd() {
        let table = provider().fallback_table("USD");
        assert_eq!(table.source(), RateSource::Fallback);
        assert_eq!(table.rate("USD"), Some(dec!(1)));
        assert_eq!(table.rate("INR"), Some(dec!(83)));
        assert_eq!(table.rate("EUR"), Some(dec!(0.92)));
    }

    #[test]
    fn test_fallback_table_rebased() {
        let table = provider().fallback_table("INR");
        assert_eq!(table.rate("INR"), Some(dec!(1)));
        let usd = table.rate("USD").unwrap();
        assert_eq!(table.to_reference(dec!(1), "USD").unwrap(), Decimal::ONE / usd);
        assert_eq!(table.to_reference(dec!(10), "USD").unwrap().round(), dec!(830));
    }

    #[test]
    fn test_fallback_unknown_reference_kept() {
        let table = provider().fallback_table("GBP");
        assert_eq!(table.rate("GBP"), Some(dec!(1)));
        assert_eq!(table.rate("INR"), Some(dec!(83)));
    }

    #[test]
    fn test_rebase() {
        let rates = BTreeMap::from([
            ("USD".to_string(), dec!(1)),
            ("EUR".to_string(), dec!(0.5)),
            ("INR".to_string(), dec!(80)),
        ]);
        let rebased = rebase(&rates, "EUR").unwrap();
        assert_eq!(rebased["EUR"], dec!(1));
        assert_eq!(rebased["USD"], dec!(2));
        assert_eq!(rebased["INR"], dec!(160));
        assert_eq!(rebase(&rates, "USD").unwrap(), rates);
        assert!(rebase(&rates, "GBP").is_none());
    }

    #[test]
    fn test_required_currencies_come_from_rules() {
        assert_eq!(provider().required_currencies(), ["EUR", "INR", "USD"]);
    }

    #[test]
    fn test_rate_source_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&RateSource::Fallback).unwrap(), "\"fallback\"");
    }
}
