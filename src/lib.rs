//! # donation-scan
//!
//! 从视频评论中提取捐赠金额，按币种汇总，并换算为统一的参考货币。
//!
//! Donation extraction for video comment streams: find currency amounts in
//! comments, total them per currency, and convert the totals to a reference
//! currency using live exchange rates.
//!
//! ## Overview
//!
//! ```text
//! CommentSource ─▶ StreamCollector ─▶ BatchPool ─▶ BatchProcessor ─▶ AmountMatcher
//!                        │
//!                        ▼
//!        RateProvider ─▶ aggregate ─▶ AnalysisReport ─▶ render_text / JSON
//! ```
//!
//! - **Best-effort**: a bad comment is skipped, a slow batch is abandoned, an
//!   unreachable rate source falls back to a fixed table. A run always ends
//!   with a report, possibly empty.
//! - **Cancellable**: a [`CancellationToken`](tokio_util::sync::CancellationToken)
//!   is checked at every pull and every wait; cancelling returns what has
//!   been merged so far.
//! - **Explicit configuration**: currency rules and limits live in one
//!   [`AnalyzerConfig`] handed to each stage at construction.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use donation_scan::{AnalyzerConfig, Comment, DonationAnalyzer, IterSource};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> donation_scan::Result<()> {
//!     let analyzer = DonationAnalyzer::new(AnalyzerConfig::default())?;
//!     let mut comments = IterSource::new(vec![
//!         Comment::new("donated $50 great stream!", "alice"),
//!         Comment::new("thanks, here's ₹500 for you", "bob"),
//!     ]);
//!
//!     let report = analyzer.analyze(&mut comments, &CancellationToken::new()).await?;
//!     println!("{}", donation_scan::report::render_text(&report, analyzer.config()));
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Comments, donation records, reports |
//! | [`config`] | Analyzer configuration and currency rules |
//! | [`matcher`] | Amount extraction and plausibility filter |
//! | [`batch`] | Batch processing, buffering and the bounded worker pool |
//! | [`collector`] | Comment sources and the streaming collection loop |
//! | [`rates`] | Exchange rates with fallback |
//! | [`aggregate`] | Per-currency totals and conversion |
//! | [`report`] | Text rendering |
//! | [`analyzer`] | End-to-end driver |

pub mod aggregate;
pub mod analyzer;
pub mod batch;
pub mod collector;
pub mod config;
pub mod matcher;
pub mod rates;
pub mod report;
pub mod types;

// Re-export main types for convenience
pub use analyzer::DonationAnalyzer;
pub use collector::{
    CollectionOutcome, CommentSource, IterSource, JsonLinesSource, StreamCollector, StreamSource,
};
pub use config::{AnalyzerConfig, CurrencyRule};
pub use rates::{RateProvider, RateSource, RateTable};
pub use types::{AnalysisReport, Comment, CurrencyTotal, DonationRecord};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
