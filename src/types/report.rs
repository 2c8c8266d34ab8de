//! Aggregated output of an analysis run.

use super::donation::DonationRecord;
use crate::rates::RateSource;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sum and count of donations in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyTotal {
    pub currency: String,
    pub sum: Decimal,
    pub count: usize,
    /// `sum` expressed in the reference currency; `None` when no usable rate exists.
    pub reference_value: Option<Decimal>,
}

impl CurrencyTotal {
    pub fn is_converted(&self) -> bool {
        self.reference_value.is_some()
    }
}

/// Batch bookkeeping for one collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub batches_submitted: usize,
    pub batches_completed: usize,
    /// Batches dropped because they did not finish in time.
    pub batches_abandoned: usize,
    /// Batches dropped because their worker failed.
    pub batches_failed: usize,
    pub cancelled: bool,
}

impl CollectionStats {
    /// True when some submitted batch contributed nothing to the result.
    pub fn is_lossy(&self) -> bool {
        self.batches_abandoned > 0 || self.batches_failed > 0 || self.cancelled
    }
}

/// Final report of an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub reference_currency: String,
    /// Sorted by currency code.
    pub per_currency_totals: Vec<CurrencyTotal>,
    pub reference_currency_total: Decimal,
    pub total_donations_found: usize,
    pub comments_processed: usize,
    pub elapsed_seconds: f64,
    /// Currencies that were found but had no rate, so add nothing to the total.
    pub unconverted_currencies: Vec<String>,
    pub rate_source: RateSource,
    #[serde(default)]
    pub collection: CollectionStats,
    pub donations: Vec<DonationRecord>,
}

impl AnalysisReport {
    /// A report with no donations in it.
    pub fn empty(reference_currency: impl Into<String>, rate_source: RateSource) -> Self {
        Self {
            reference_currency: reference_currency.into(),
            per_currency_totals: Vec::new(),
            reference_currency_total: Decimal::ZERO,
            total_donations_found: 0,
            comments_processed: 0,
            elapsed_seconds: 0.0,
            unconverted_currencies: Vec::new(),
            rate_source,
            collection: CollectionStats::default(),
            donations: Vec::new(),
        }
    }

    /// Attach the statistics of the collection run that produced the records.
    pub fn with_run_stats(
        mut self,
        comments_processed: usize,
        elapsed_seconds: f64,
        collection: CollectionStats,
    ) -> Self {
        self.comments_processed = comments_processed;
        self.elapsed_seconds = elapsed_seconds;
        self.collection = collection;
        self
    }

    pub fn total_for(&self, currency: &str) -> Option<&CurrencyTotal> {
        self.per_currency_totals
            .iter()
            .find(|t| t.currency == currency)
    }

    pub fn is_empty(&self) -> bool {
        self.donations.is_empty()
    }
}
