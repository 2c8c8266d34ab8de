//! Pipeline driver: rates, collection, aggregation.

use crate::aggregate::aggregate;
use crate::batch::{BatchProcessor, BatchWork};
use crate::collector::{CommentSource, StreamCollector};
use crate::config::AnalyzerConfig;
use crate::rates::{RateProvider, RateTable};
use crate::types::AnalysisReport;
use crate::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Runs one analysis over a comment source.
///
/// ```rust,no_run
/// use donation_scan::{AnalyzerConfig, DonationAnalyzer, IterSource, Comment};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() -> donation_scan::Result<()> {
/// let analyzer = DonationAnalyzer::new(AnalyzerConfig::default())?;
/// let mut source = IterSource::new(vec![Comment::new("donated $5", "alice")]);
/// let report = analyzer.analyze(&mut source, &CancellationToken::new()).await?;
/// println!("{} donations", report.total_donations_found);
/// # Ok(())
/// # }
/// ```
pub struct DonationAnalyzer {
    config: AnalyzerConfig,
    rates: RateProvider,
    collector: StreamCollector,
}

impl DonationAnalyzer {
    /// Validates `config` and compiles its currency rules.
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        let processor = BatchProcessor::new(&config)?;
        Self::with_worker(config, Arc::new(processor))
    }

    /// Use a custom batch worker instead of the rule-based processor.
    pub fn with_worker(config: AnalyzerConfig, worker: Arc<dyn BatchWork>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            rates: RateProvider::new(&config)?,
            collector: StreamCollector::new(&config, worker),
            config,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Collect donations from `source` and build the report.
    ///
    /// Rates are fetched first; if `cancel` fires during the fetch the
    /// fallback table is used. Collection problems never fail the run. If the
    /// collected records cannot be aggregated (a worker produced a malformed
    /// record) the error is logged and an empty report is returned.
    pub async fn analyze<S>(&self, source: &mut S, cancel: &CancellationToken) -> Result<AnalysisReport>
    where
        S: CommentSource + ?Sized,
    {
        let rates = self.fetch_rates(cancel).await;
        info!(
            reference = rates.reference(),
            source = ?rates.source(),
            "exchange rates ready"
        );

        let outcome = self.collector.collect(source, cancel).await;
        let report = aggregate(&outcome.records, &rates)
            .unwrap_or_else(|e| {
                error!(
                    error = %e,
                    donations = outcome.records.len(),
                    "could not aggregate donations, reporting none"
                );
                AnalysisReport::empty(rates.reference(), rates.source())
            })
            .with_run_stats(
                outcome.comments_processed,
                outcome.elapsed.as_secs_f64(),
                outcome.stats,
            );
        info!(
            donations = report.total_donations_found,
            currencies = report.per_currency_totals.len(),
            total = %report.reference_currency_total.round_dp(2),
            reference = %report.reference_currency,
            "analysis complete"
        );
        Ok(report)
    }

    async fn fetch_rates(&self, cancel: &CancellationToken) -> RateTable {
        let reference = self.config.reference_currency.as_str();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("cancelled while fetching exchange rates, using fallback rates");
                self.rates.fallback_table(reference)
            }
            table = self.rates.fetch_rates(reference, &self.config.exchange_rate_api) => table,
        }
    }
}
