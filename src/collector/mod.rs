//! 流式收集模块：从评论源拉取评论、分批派发到工作池，并在超时与取消约束下合并结果。
//!
//! # Stream Collector
//!
//! Drives a whole collection run:
//!
//! ```text
//! CommentSource ──pull──▶ BatchBuffer ──full──▶ BatchPool (max_workers)
//!                                                   │
//!            records ◀──merge── await oldest / drain completed
//! ```
//!
//! The loop moves through `Streaming → Draining → Done`, jumping straight to
//! `Done` when the cancellation token fires.
//!
//! ## Waiting rules
//!
//! - After each submit, while more than one batch is in flight, the older
//!   batches are awaited for at most `batch_timeout` in total and at most
//!   `processing_timeout` each.
//! - When the stream ends, the partial buffer is submitted and everything
//!   outstanding is awaited for at most `final_drain_timeout` in total, with
//!   the same per-batch limit.
//! - A batch that misses its window is abandoned: its records are lost and a
//!   warning is logged. The run itself never fails.
//!
//! ## Cancellation
//!
//! The token is checked at every pull and every wait. Once it fires, nothing
//! more is pulled, queued batches are dropped, running ones are not waited
//! for, and the records merged so far are returned.
//!
//! Only this loop mutates the record list and counters; workers return owned
//! results.

mod source;

pub use source::{CommentSource, IterSource, JsonLinesSource, StreamSource};

use crate::batch::{BatchBuffer, BatchOutcome, BatchPool, BatchWork};
use crate::config::AnalyzerConfig;
use crate::types::{CollectionStats, Comment, DonationRecord};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectorState {
    Streaming,
    Draining,
    Done,
}

/// Result of a collection run.
#[derive(Debug, Clone, Default)]
pub struct CollectionOutcome {
    /// In no particular order.
    pub records: Vec<DonationRecord>,
    pub comments_processed: usize,
    pub stats: CollectionStats,
    pub elapsed: Duration,
}

impl CollectionOutcome {
    pub fn comments_per_second(&self) -> f64 {
        rate(self.comments_processed, self.elapsed)
    }
}

/// Mutable state of one run, owned by the driving loop.
#[derive(Default)]
struct RunState {
    records: Vec<DonationRecord>,
    comments: usize,
    next_batch_id: u64,
    stats: CollectionStats,
}

impl RunState {
    fn merge(&mut self, outcome: BatchOutcome) {
        match outcome {
            BatchOutcome::Completed { batch_id, records } => {
                debug!(batch_id, donations = records.len(), "merged batch");
                self.stats.batches_completed += 1;
                self.records.extend(records);
            }
            BatchOutcome::TimedOut { batch_id, waited } => {
                warn!(
                    batch_id,
                    waited_ms = waited.as_millis() as u64,
                    "batch timed out, skipping its donations"
                );
                self.stats.batches_abandoned += 1;
            }
            BatchOutcome::Failed { batch_id, reason } => {
                error!(batch_id, %reason, "error processing batch, skipping it");
                self.stats.batches_failed += 1;
            }
            BatchOutcome::Cancelled { batch_id } => {
                debug!(batch_id, "batch cancelled");
            }
        }
    }
}

/// Pulls comments, batches them, and merges the workers' records.
pub struct StreamCollector {
    worker: Arc<dyn BatchWork>,
    max_workers: usize,
    batch_size: usize,
    batch_timeout: Duration,
    processing_timeout: Duration,
    final_drain_timeout: Duration,
}

impl StreamCollector {
    pub fn new(config: &AnalyzerConfig, worker: Arc<dyn BatchWork>) -> Self {
        Self {
            worker,
            max_workers: config.max_workers.max(1),
            batch_size: config.batch_size.max(1),
            batch_timeout: config.batch_timeout_duration(),
            processing_timeout: config.processing_timeout_duration(),
            final_drain_timeout: config.final_drain_timeout_duration(),
        }
    }

    /// Run one collection over `source` until it is exhausted or `cancel` fires.
    pub async fn collect<S>(&self, source: &mut S, cancel: &CancellationToken) -> CollectionOutcome
    where
        S: CommentSource + ?Sized,
    {
        let start = Instant::now();
        let mut pool = BatchPool::new(Arc::clone(&self.worker), self.max_workers);
        let mut buffer: BatchBuffer<Comment> = BatchBuffer::new(self.batch_size);
        let mut run = RunState {
            next_batch_id: 1,
            ..RunState::default()
        };
        let mut state = CollectorState::Streaming;

        while state == CollectorState::Streaming {
            let pulled = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = source.next_comment() => Some(next),
            };
            let Some(next) = pulled else {
                state = CollectorState::Done;
                break;
            };

            match next {
                Ok(Some(comment)) => {
                    run.comments += 1;
                    if run.comments % self.batch_size == 0 {
                        info!(
                            comments = run.comments,
                            rate = %format!("{:.1}", rate(run.comments, start.elapsed())),
                            "processed comments (comments/sec)"
                        );
                    }
                    if buffer.push(comment).should_flush() {
                        for outcome in pool.drain_completed().await {
                            run.merge(outcome);
                        }
                        self.submit(&mut pool, &mut run, buffer.take());
                        if pool.in_flight() > 1 {
                            self.drain_older(&mut pool, &mut run, cancel).await;
                        }
                        if cancel.is_cancelled() {
                            state = CollectorState::Done;
                        }
                    }
                }
                Ok(None) => state = CollectorState::Draining,
                Err(e) => {
                    error!(error = %e, comments = run.comments, "error fetching comments, stopping collection");
                    state = CollectorState::Draining;
                }
            }
        }
        debug!(?state, "comment stream closed");

        if state == CollectorState::Draining {
            if !buffer.is_empty() {
                self.submit(&mut pool, &mut run, buffer.take());
            }
            self.drain_all(&mut pool, &mut run, cancel).await;
        }

        if cancel.is_cancelled() {
            run.stats.cancelled = true;
            let dropped = pool.cancel_all();
            info!(
                dropped_batches = dropped,
                donations = run.records.len(),
                "stopping comment collection, returning partial results"
            );
        } else {
            let leftover = pool.cancel_all();
            run.stats.batches_abandoned += leftover;
        }

        let outcome = CollectionOutcome {
            records: run.records,
            comments_processed: run.comments,
            stats: run.stats,
            elapsed: start.elapsed(),
        };
        if outcome.comments_processed == 0 {
            warn!("no comments were processed; the video might be unavailable or have no comments");
        } else {
            info!(
                comments = outcome.comments_processed,
                elapsed_secs = %format!("{:.1}", outcome.elapsed.as_secs_f64()),
                rate = %format!("{:.1}", outcome.comments_per_second()),
                "finished processing comments"
            );
        }
        outcome
    }

    fn submit(&self, pool: &mut BatchPool, run: &mut RunState, comments: Vec<Comment>) {
        let batch_id = run.next_batch_id;
        run.next_batch_id += 1;
        run.stats.batches_submitted += 1;
        debug!(batch_id, size = comments.len(), in_flight = pool.in_flight(), "submitting batch");
        pool.submit(batch_id, comments);
    }

    /// Merge every batch but the newest, within `batch_timeout`.
    async fn drain_older(&self, pool: &mut BatchPool, run: &mut RunState, cancel: &CancellationToken) {
        let deadline = deadline_after(self.batch_timeout);
        while pool.in_flight() > 1 && !cancel.is_cancelled() {
            let wait = deadline
                .saturating_duration_since(Instant::now())
                .min(self.processing_timeout);
            match pool.await_oldest(wait, cancel).await {
                Some(outcome) => run.merge(outcome),
                None => break,
            }
        }
    }

    /// Merge everything outstanding, within `final_drain_timeout`.
    async fn drain_all(&self, pool: &mut BatchPool, run: &mut RunState, cancel: &CancellationToken) {
        let deadline = deadline_after(self.final_drain_timeout);
        while !pool.is_idle() && !cancel.is_cancelled() {
            let wait = deadline
                .saturating_duration_since(Instant::now())
                .min(self.processing_timeout);
            match pool.await_oldest(wait, cancel).await {
                Some(outcome) => run.merge(outcome),
                None => break,
            }
        }
    }
}

/// `now + budget`, saturating at a day for budgets the clock cannot represent.
fn deadline_after(budget: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(budget)
        .or_else(|| now.checked_add(Duration::from_secs(86_400)))
        .unwrap_or(now)
}

fn rate(count: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchProcessor;

    fn collector(batch_size: usize) -> StreamCollector {
        let config = AnalyzerConfig::new().with_batch_size(batch_size);
        let processor = BatchProcessor::new(&config).unwrap();
        StreamCollector::new(&config, Arc::new(processor))
    }

    #[tokio::test]
    async fn test_collects_across_batches_and_partial_tail() {
        let comments: Vec<Comment> = (0..7)
            .map(|i| Comment::new(format!("sent ${} ", i + 1), format!("user{}", i)))
            .collect();
        let mut source = IterSource::new(comments);

        let outcome = collector(3).collect(&mut source, &CancellationToken::new()).await;
        assert_eq!(outcome.comments_processed, 7);
        assert_eq!(outcome.records.len(), 7);
        assert_eq!(outcome.stats.batches_submitted, 3);
        assert_eq!(outcome.stats.batches_completed, 3);
        assert!(!outcome.stats.is_lossy());
    }

    #[tokio::test]
    async fn test_empty_source() {
        let mut source = IterSource::new(Vec::<Comment>::new());
        let outcome = collector(10).collect(&mut source, &CancellationToken::new()).await;
        assert_eq!(outcome.comments_processed, 0);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.stats.batches_submitted, 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut source = IterSource::new(vec![Comment::new("$5", "a")]);
        let outcome = collector(1).collect(&mut source, &cancel).await;
        assert_eq!(outcome.comments_processed, 0);
        assert!(outcome.stats.cancelled);
    }

    #[test]
    fn test_deadline_after_huge_budget_does_not_overflow() {
        let before = Instant::now();
        assert!(deadline_after(Duration::MAX) >= before);
        let soon = deadline_after(Duration::from_millis(10));
        assert!(soon >= before + Duration::from_millis(10));
    }

    #[test]
    fn test_outcome_rate() {
        let outcome = CollectionOutcome {
            comments_processed: 30,
            elapsed: Duration::from_secs(3),
            ..CollectionOutcome::default()
        };
        assert_eq!(outcome.comments_per_second(), 10.0);
    }

    #[test]
    fn test_rate() {
        assert_eq!(rate(10, Duration::ZERO), 0.0);
        assert_eq!(rate(10, Duration::from_secs(2)), 5.0);
    }
}
