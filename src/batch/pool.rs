//! Bounded batch pool.

use super::processor::BatchWork;
use crate::types::{Comment, DonationRecord};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

/// How a submitted batch ended, from the collector's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed {
        batch_id: u64,
        records: Vec<DonationRecord>,
    },
    /// Not finished within the wait budget; its result is discarded.
    TimedOut { batch_id: u64, waited: Duration },
    /// The worker failed (panicked) while processing the batch.
    Failed { batch_id: u64, reason: String },
    /// Dropped because the run was cancelled.
    Cancelled { batch_id: u64 },
}

impl BatchOutcome {
    pub fn batch_id(&self) -> u64 {
        match self {
            BatchOutcome::Completed { batch_id, .. }
            | BatchOutcome::TimedOut { batch_id, .. }
            | BatchOutcome::Failed { batch_id, .. }
            | BatchOutcome::Cancelled { batch_id } => *batch_id,
        }
    }
}

type BatchTask = JoinHandle<std::result::Result<Vec<DonationRecord>, String>>;

#[derive(Debug)]
struct InflightBatch {
    batch_id: u64,
    size: usize,
    submitted_at: Instant,
    handle: BatchTask,
}

/// Queue of batches running on a fixed number of workers.
///
/// `submit` never blocks: batches beyond `max_workers` wait for a permit.
/// Results are taken out in submission order with [`BatchPool::await_oldest`]
/// or opportunistically with [`BatchPool::drain_completed`]. A worker holds
/// its permit until its work really ends, so an abandoned batch keeps
/// occupying a worker slot until it finishes.
///
/// Must be used from within a Tokio runtime.
pub struct BatchPool {
    worker: Arc<dyn BatchWork>,
    permits: Arc<Semaphore>,
    inflight: VecDeque<InflightBatch>,
}

impl BatchPool {
    pub fn new(worker: Arc<dyn BatchWork>, max_workers: usize) -> Self {
        Self {
            worker,
            permits: Arc::new(Semaphore::new(max_workers.max(1))),
            inflight: VecDeque::new(),
        }
    }

    /// Number of submitted batches whose outcome has not been taken yet.
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_idle(&self) -> bool {
        self.inflight.is_empty()
    }

    pub fn submit(&mut self, batch_id: u64, comments: Vec<Comment>) {
        let size = comments.len();
        let worker = Arc::clone(&self.worker);
        let permits = Arc::clone(&self.permits);
        let handle = tokio::spawn(async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|_| "worker pool closed".to_string())?;
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                worker.process_batch(comments, batch_id)
            })
            .await
            .map_err(|e| describe_join_error(&e, e.is_panic()))
        });
        self.inflight.push_back(InflightBatch {
            batch_id,
            size,
            submitted_at: Instant::now(),
            handle,
        });
    }

    /// Take the outcomes of every batch that has already finished, without waiting.
    pub async fn drain_completed(&mut self) -> Vec<BatchOutcome> {
        let (done, pending): (Vec<_>, Vec<_>) = self
            .inflight
            .drain(..)
            .partition(|b| b.handle.is_finished());
        self.inflight = pending.into();

        let mut outcomes = Vec::with_capacity(done.len());
        for batch in done {
            let batch_id = batch.batch_id;
            outcomes.push(into_outcome(batch_id, batch.handle.await));
        }
        outcomes
    }

    /// Wait up to `timeout` for the oldest batch.
    ///
    /// On timeout or cancellation the batch is aborted and its result is lost.
    /// Returns `None` when nothing is in flight.
    pub async fn await_oldest(
        &mut self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Option<BatchOutcome> {
        let mut batch = self.inflight.pop_front()?;
        let batch_id = batch.batch_id;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                batch.handle.abort();
                BatchOutcome::Cancelled { batch_id }
            }
            joined = tokio::time::timeout(timeout, &mut batch.handle) => match joined {
                Ok(result) => into_outcome(batch_id, result),
                Err(_) => {
                    batch.handle.abort();
                    BatchOutcome::TimedOut {
                        batch_id,
                        waited: batch.submitted_at.elapsed(),
                    }
                }
            },
        };
        tracing::trace!(batch_id, size = batch.size, ?outcome, "batch awaited");
        Some(outcome)
    }

    /// Stop all outstanding work without waiting for it.
    ///
    /// Batches still queued for a worker never start; running ones are
    /// detached and their results discarded. Returns how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        self.permits.close();
        let dropped = self.inflight.len();
        for batch in self.inflight.drain(..) {
            batch.handle.abort();
        }
        dropped
    }
}

impl Drop for BatchPool {
    fn drop(&mut self) {
        for batch in &self.inflight {
            batch.handle.abort();
        }
    }
}

fn into_outcome(
    batch_id: u64,
    result: std::result::Result<std::result::Result<Vec<DonationRecord>, String>, JoinError>,
) -> BatchOutcome {
    match result {
        Ok(Ok(records)) => BatchOutcome::Completed { batch_id, records },
        Ok(Err(reason)) => BatchOutcome::Failed { batch_id, reason },
        Err(e) if e.is_cancelled() => BatchOutcome::Cancelled { batch_id },
        Err(e) => BatchOutcome::Failed {
            batch_id,
            reason: describe_join_error(&e, e.is_panic()),
        },
    }
}

fn describe_join_error(e: &JoinError, panicked: bool) -> String {
    if panicked {
        format!("worker panicked: {}", e)
    } else {
        format!("worker stopped: {}", e)
    }
}
