//! 汇总模块：按币种分组求和，并换算为参考货币。
//!
//! # Aggregator
//!
//! Pure function from records plus a [`RateTable`] to an [`AnalysisReport`].
//! No I/O; the result depends only on the inputs, so running it twice gives
//! identical reports.
//!
//! - Totals are grouped by currency code and listed in lexicographic order.
//! - The reference currency's sum is used as-is; any other sum is divided by
//!   its rate.
//! - A currency without a usable rate contributes nothing to the reference
//!   total and is listed in `unconverted_currencies`.
//!
//! Run statistics (`comments_processed`, `elapsed_seconds`, collector
//! counters) are left at zero here and attached by the caller with
//! [`AnalysisReport::with_run_stats`].

use crate::rates::RateTable;
use crate::types::{AnalysisReport, CollectionStats, CurrencyTotal, DonationRecord};
use crate::{Error, ErrorContext, Result};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Default)]
struct Bucket {
    sum: Decimal,
    count: usize,
}

/// Build the report for `records` converted with `rates`.
///
/// Fails only on records no matcher can produce: an empty currency code, a
/// non-positive amount, or a sum that overflows.
pub fn aggregate(records: &[DonationRecord], rates: &RateTable) -> Result<AnalysisReport> {
    let mut buckets: BTreeMap<&str, Bucket> = BTreeMap::new();
    for (i, record) in records.iter().enumerate() {
        if record.currency.trim().is_empty() {
            return Err(malformed("donation has no currency", i));
        }
        if record.amount <= Decimal::ZERO {
            return Err(malformed("donation amount must be positive", i));
        }
        let bucket = buckets.entry(record.currency.as_str()).or_default();
        bucket.sum = bucket
            .sum
            .checked_add(record.amount)
            .ok_or_else(|| malformed("currency total overflowed", i))?;
        bucket.count += 1;
    }

    let mut totals = Vec::with_capacity(buckets.len());
    let mut unconverted = Vec::new();
    let mut reference_total = Decimal::ZERO;
    for (currency, bucket) in buckets {
        let reference_value = rates.to_reference(bucket.sum, currency);
        match reference_value {
            Some(value) => {
                reference_total = reference_total.checked_add(value).ok_or_else(|| {
                    Error::validation_with_context(
                        "reference total overflowed",
                        ErrorContext::new()
                            .with_field_path("reference_currency_total")
                            .with_source("aggregator"),
                    )
                })?;
            }
            None => {
                warn!(currency, sum = %bucket.sum, "no exchange rate, excluded from reference total");
                unconverted.push(currency.to_string());
            }
        }
        totals.push(CurrencyTotal {
            currency: currency.to_string(),
            sum: bucket.sum,
            count: bucket.count,
            reference_value,
        });
    }

    Ok(AnalysisReport {
        reference_currency: rates.reference().to_string(),
        per_currency_totals: totals,
        reference_currency_total: reference_total,
        total_donations_found: records.len(),
        comments_processed: 0,
        elapsed_seconds: 0.0,
        unconverted_currencies: unconverted,
        rate_source: rates.source(),
        collection: CollectionStats::default(),
        donations: records.to_vec(),
    })
}

fn malformed(msg: &str, index: usize) -> Error {
    Error::validation_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(format!("records[{}]", index))
            .with_source("aggregator"),
    )
}
