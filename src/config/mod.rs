//! 配置模块：解析分析器配置、货币规则、配置文件与环境变量覆盖。
//!
//! # Configuration Module
//!
//! Everything the pipeline needs is resolved into one immutable
//! [`AnalyzerConfig`] before a run starts. The matcher, the batch processor
//! and the collector receive it (or parts of it) at construction time; there
//! is no process-wide mutable state.
//!
//! ## Sources
//!
//! Values are layered, later layers winning:
//!
//! 1. Built-in defaults ([`AnalyzerConfig::default`])
//! 2. A JSON or YAML file; fields missing from the file keep their defaults
//! 3. `DONATION_*` environment variables ([`AnalyzerConfig::apply_env_overrides`])
//!
//! A missing file is not an error. A malformed file is an error for
//! [`AnalyzerConfig::from_file`] and a logged warning for
//! [`AnalyzerConfig::load_or_default`].
//!
//! ## Example
//!
//! ```rust
//! use donation_scan::config::AnalyzerConfig;
//!
//! let config = AnalyzerConfig::new()
//!     .with_max_workers(8)
//!     .with_batch_size(500);
//! assert!(config.validate().is_ok());
//! ```

mod rules;

pub use rules::CurrencyRule;

use crate::{Error, ErrorContext, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_RATE_API: &str = "https://open.er-api.com/v6/latest/USD";

/// Resolved configuration of an analysis run.
///
/// Timeouts are stored in seconds so config files stay readable; use the
/// `*_duration` accessors in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Ceiling on concurrently running batches.
    pub max_workers: usize,
    /// Comments per batch.
    pub batch_size: usize,
    /// Longest wait when opportunistically draining older batches.
    pub batch_timeout: f64,
    /// Longest wait for one selected batch.
    pub processing_timeout: f64,
    /// Longest wait for all outstanding batches once the stream ends.
    pub final_drain_timeout: f64,
    /// Comments longer than this (in characters) are skipped as spam.
    pub max_comment_length: usize,
    pub reference_currency: String,
    pub exchange_rate_api: String,
    pub rate_request_timeout: f64,
    /// Used whenever live rates are unavailable.
    pub fallback_rates: BTreeMap<String, Decimal>,
    pub currency_rules: Vec<CurrencyRule>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            batch_size: 1000,
            batch_timeout: 10.0,
            processing_timeout: 5.0,
            final_drain_timeout: 30.0,
            max_comment_length: 500,
            reference_currency: "USD".to_string(),
            exchange_rate_api: DEFAULT_RATE_API.to_string(),
            rate_request_timeout: 10.0,
            fallback_rates: default_fallback_rates(),
            currency_rules: CurrencyRule::defaults(),
        }
    }
}

/// Units of each currency per one US dollar.
fn default_fallback_rates() -> BTreeMap<String, Decimal> {
    BTreeMap::from([
        ("USD".to_string(), Decimal::ONE),
        ("INR".to_string(), Decimal::from(83)),
        ("EUR".to_string(), Decimal::new(92, 2)),
    ])
}

impl AnalyzerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_workers(mut self, n: usize) -> Self {
        self.max_workers = n;
        self
    }

    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    pub fn with_batch_timeout(mut self, t: Duration) -> Self {
        self.batch_timeout = t.as_secs_f64();
        self
    }

    pub fn with_processing_timeout(mut self, t: Duration) -> Self {
        self.processing_timeout = t.as_secs_f64();
        self
    }

    pub fn with_final_drain_timeout(mut self, t: Duration) -> Self {
        self.final_drain_timeout = t.as_secs_f64();
        self
    }

    pub fn with_exchange_rate_api(mut self, url: impl Into<String>) -> Self {
        self.exchange_rate_api = url.into();
        self
    }

    pub fn with_reference_currency(mut self, code: impl Into<String>) -> Self {
        self.reference_currency = code.into();
        self
    }

    pub fn with_currency_rules(mut self, rules: Vec<CurrencyRule>) -> Self {
        self.currency_rules = rules;
        self
    }

    pub fn with_fallback_rates(mut self, rates: BTreeMap<String, Decimal>) -> Self {
        self.fallback_rates = rates;
        self
    }

    pub fn batch_timeout_duration(&self) -> Duration {
        secs(self.batch_timeout)
    }

    pub fn processing_timeout_duration(&self) -> Duration {
        secs(self.processing_timeout)
    }

    pub fn final_drain_timeout_duration(&self) -> Duration {
        secs(self.final_drain_timeout)
    }

    pub fn rate_request_timeout_duration(&self) -> Duration {
        secs(self.rate_request_timeout)
    }

    /// Display symbol for a currency, taken from the first rule that names it.
    pub fn symbol_for(&self, currency: &str) -> Option<&str> {
        self.currency_rules
            .iter()
            .find(|r| r.currency == currency)
            .map(|r| r.symbol.as_str())
    }

    /// Currency codes named by the rules, deduplicated and sorted.
    pub fn rule_currencies(&self) -> Vec<String> {
        let mut codes: Vec<String> = self
            .currency_rules
            .iter()
            .map(|r| r.currency.clone())
            .collect();
        codes.sort();
        codes.dedup();
        codes
    }

    /// Load and validate a configuration file. YAML is used for `.yaml`/`.yml`
    /// extensions, JSON otherwise.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let config: Self = if is_yaml {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configuration the way the CLI does: file if present,
    /// defaults otherwise, then environment overrides. Never fails.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let base = match path {
            None => Self::default(),
            Some(p) if !p.exists() => {
                debug!(path = %p.display(), "config file not found, using defaults");
                Self::default()
            }
            Some(p) => match Self::from_file(p) {
                Ok(c) => c,
                Err(e) => {
                    warn!(path = %p.display(), error = %e, "could not load config, using defaults");
                    Self::default()
                }
            },
        };
        let merged = base.clone().apply_env_overrides();
        match merged.validate() {
            Ok(()) => merged,
            Err(e) => {
                warn!(error = %e, "environment overrides rejected, ignoring them");
                base
            }
        }
    }

    /// Apply `DONATION_*` environment variables. Unparseable values are ignored.
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(n) = lookup("DONATION_MAX_WORKERS").and_then(|s| s.parse::<usize>().ok()) {
            self.max_workers = n;
        }
        if let Some(n) = lookup("DONATION_BATCH_SIZE").and_then(|s| s.parse::<usize>().ok()) {
            self.batch_size = n;
        }
        if let Some(t) = lookup("DONATION_BATCH_TIMEOUT_SECS").and_then(|s| s.parse::<f64>().ok()) {
            self.batch_timeout = t;
        }
        if let Some(t) =
            lookup("DONATION_PROCESSING_TIMEOUT_SECS").and_then(|s| s.parse::<f64>().ok())
        {
            self.processing_timeout = t;
        }
        if let Some(url) = lookup("DONATION_RATE_API").filter(|s| !s.trim().is_empty()) {
            self.exchange_rate_api = url;
        }
        if let Some(code) = lookup("DONATION_REFERENCE_CURRENCY").filter(|s| !s.trim().is_empty()) {
            self.reference_currency = code.trim().to_uppercase();
        }
        self
    }

    /// Check ranges and compile every rule pattern.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(invalid("max_workers must be at least 1", "max_workers"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size must be at least 1", "batch_size"));
        }
        for (name, value) in [
            ("batch_timeout", self.batch_timeout),
            ("processing_timeout", self.processing_timeout),
            ("final_drain_timeout", self.final_drain_timeout),
            ("rate_request_timeout", self.rate_request_timeout),
        ] {
            if !value.is_finite() || value <= 0.0 || value > MAX_TIMEOUT_SECS {
                return Err(Error::validation_with_context(
                    format!(
                        "{} must be a positive number of seconds, at most {}",
                        name, MAX_TIMEOUT_SECS
                    ),
                    ErrorContext::new()
                        .with_field_path(name)
                        .with_details(format!("got {}", value))
                        .with_source("config_validator"),
                ));
            }
        }
        if self.reference_currency.trim().is_empty() {
            return Err(invalid(
                "reference_currency must not be empty",
                "reference_currency",
            ));
        }
        for (i, rule) in self.currency_rules.iter().enumerate() {
            if rule.max_amount <= Decimal::ZERO {
                return Err(invalid(
                    "max_amount must be positive",
                    format!("currency_rules[{}].max_amount", i),
                ));
            }
            rule.compile().map_err(|e| {
                Error::validation_with_context(
                    e.to_string(),
                    ErrorContext::new()
                        .with_field_path(format!("currency_rules[{}].pattern", i))
                        .with_source("config_validator"),
                )
            })?;
        }
        Ok(())
    }
}

fn invalid(msg: &str, field: impl Into<String>) -> Error {
    Error::validation_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(field)
            .with_source("config_validator"),
    )
}

/// Upper bound for every timeout setting: one day.
pub const MAX_TIMEOUT_SECS: f64 = 86_400.0;

// Out-of-range inputs are rejected by `validate`; clamp here so the accessors
// never panic on an unvalidated config.
fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value.min(MAX_TIMEOUT_SECS))
    } else {
        Duration::ZERO
    }
}
