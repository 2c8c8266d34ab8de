//! Human-readable rendering of an [`AnalysisReport`].
//!
//! JSON output needs nothing from here: the report is `Serialize`.

use crate::config::AnalyzerConfig;
use crate::rates::RateSource;
use crate::types::AnalysisReport;
use rust_decimal::Decimal;
use std::fmt::Write;

/// Render `report` as plain text, using the display symbols of `config`'s rules.
pub fn render_text(report: &AnalysisReport, config: &AnalyzerConfig) -> String {
    let mut out = String::new();
    let money = |amount: Decimal, currency: &str| match config.symbol_for(currency) {
        Some(symbol) => format!("{}{:.2}", symbol, amount),
        None => format!("{:.2} {}", amount, currency),
    };

    if report.is_empty() {
        out.push_str("No donations found.\n");
    } else {
        out.push_str("Donations found:\n");
        for d in &report.donations {
            let _ = writeln!(
                out,
                "  {} from {} (original: {})",
                money(d.amount, &d.currency),
                d.author,
                d.matched_text
            );
        }

        out.push_str("\nTotals per currency:\n");
        for total in &report.per_currency_totals {
            let converted = match total.reference_value {
                Some(value) => format!("= {:.2} {}", value, report.reference_currency),
                None => "(no rate)".to_string(),
            };
            let _ = writeln!(
                out,
                "  {}: {} from {} donation(s) {}",
                total.currency,
                money(total.sum, &total.currency),
                total.count,
                converted
            );
        }
    }

    let rates = match report.rate_source {
        RateSource::Live => "live rates",
        RateSource::Fallback => "fallback rates",
    };
    let _ = writeln!(
        out,
        "\nTotal in {}: {:.2} ({})",
        report.reference_currency, report.reference_currency_total, rates
    );
    let _ = writeln!(
        out,
        "Donations: {}, comments processed: {}, elapsed: {:.1}s",
        report.total_donations_found, report.comments_processed, report.elapsed_seconds
    );

    let stats = &report.collection;
    if stats.cancelled {
        out.push_str("Interrupted: results are partial.\n");
    }
    if stats.batches_abandoned > 0 || stats.batches_failed > 0 {
        let _ = writeln!(
            out,
            "Warning: {} batch(es) timed out and {} failed; totals may be undercounted.",
            stats.batches_abandoned, stats.batches_failed
        );
    }
    out
}
