//! 批处理模块：将评论分批，并在固定大小的工作池中并行提取捐赠金额。
//!
//! # Batch Module
//!
//! Comments are processed in fixed-size batches, each batch being one unit
//! of concurrent work. This module holds the three pieces the stream
//! collector composes:
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchBuffer`] | Accumulates comments until a batch is full |
//! | [`BatchProcessor`] | Turns one batch of comments into donation records |
//! | [`BatchWork`] | Seam between the pool and whatever processes a batch |
//! | [`BatchPool`] | Bounded queue: submit / drain completed / await with timeout / cancel all |
//! | [`BatchOutcome`] | Completed, timed out, failed or cancelled |
//!
//! ## Failure model
//!
//! Batches are independent. A comment that cannot be used is skipped inside
//! its batch; a batch whose worker fails or does not finish in time is
//! dropped as a whole. Neither aborts the run.
//!
//! ## Example
//!
//! ```rust
//! use donation_scan::batch::{BatchProcessor, BatchWork};
//! use donation_scan::config::AnalyzerConfig;
//! use donation_scan::types::Comment;
//!
//! let processor = BatchProcessor::new(&AnalyzerConfig::default()).unwrap();
//! let records = processor.process_batch(
//!     vec![Comment::new("sent $15 keep it up", "viewer42")],
//!     1,
//! );
//! assert_eq!(records.len(), 1);
//! ```

mod buffer;
mod pool;
mod processor;

pub use buffer::{BatchAddResult, BatchBuffer};
pub use pool::{BatchOutcome, BatchPool};
pub use processor::{BatchProcessor, BatchWork};
