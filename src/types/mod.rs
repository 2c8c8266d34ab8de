//! 类型系统模块：定义评论、捐赠记录与分析报告的核心数据类型。
//!
//! # Types Module
//!
//! Plain data carried between the pipeline stages. Everything here is
//! immutable once built: workers hand back owned records, the collector
//! merges them, and the aggregator derives totals from the full list.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Comment`] | One comment as delivered by a comment source |
//! | [`DonationRecord`] | One amount found in one comment |
//! | [`CurrencyTotal`] | Per-currency sum and count, with its reference value |
//! | [`CollectionStats`] | Batch bookkeeping from a collection run |
//! | [`AnalysisReport`] | Final output of an analysis run |

pub mod comment;
pub mod donation;
pub mod report;

pub use comment::Comment;
pub use donation::DonationRecord;
pub use report::{AnalysisReport, CollectionStats, CurrencyTotal};
