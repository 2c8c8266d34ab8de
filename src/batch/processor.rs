//! Batch processor.

use crate::config::AnalyzerConfig;
use crate::matcher::AmountMatcher;
use crate::types::{Comment, DonationRecord};
use crate::Result;
use tracing::debug;

/// Unit of work executed by the worker pool for one batch.
///
/// Implementations must not touch shared state: they return owned records
/// and the collector merges them.
pub trait BatchWork: Send + Sync + 'static {
    fn process_batch(&self, comments: Vec<Comment>, batch_id: u64) -> Vec<DonationRecord>;
}

/// Applies the [`AmountMatcher`] to every usable comment of a batch.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    matcher: AmountMatcher,
    max_comment_length: usize,
}

impl BatchProcessor {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        Ok(Self {
            matcher: AmountMatcher::new(&config.currency_rules)?,
            max_comment_length: config.max_comment_length,
        })
    }

    fn process_comment(&self, comment: &Comment, batch_id: u64) -> Result<Vec<DonationRecord>> {
        let (text, author) = comment.usable_fields(self.max_comment_length)?;
        let records = self
            .matcher
            .find_amounts(text)
            .into_iter()
            .map(|m| {
                debug!(batch_id, currency = %m.currency, amount = %m.amount, author, "found donation");
                DonationRecord::new(m.amount, m.currency, m.excerpt, author)
            })
            .collect();
        Ok(records)
    }
}

impl BatchWork for BatchProcessor {
    fn process_batch(&self, comments: Vec<Comment>, batch_id: u64) -> Vec<DonationRecord> {
        let mut records = Vec::new();
        let mut skipped = 0usize;
        for comment in &comments {
            match self.process_comment(comment, batch_id) {
                Ok(found) => records.extend(found),
                Err(e) => {
                    skipped += 1;
                    debug!(batch_id, error = %e, "skipping comment");
                }
            }
        }
        debug!(
            batch_id,
            comments = comments.len(),
            skipped,
            donations = records.len(),
            "batch processed"
        );
        records
    }
}
