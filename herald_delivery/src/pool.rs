use crate::{DeliveryQueue, DeliveryResult, QueueEntry, Sender};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use herald_core::Report;
use herald_sync::{Gate, Latch};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Receives the terminal result of every report that leaves the queue.
pub trait OutcomeSink: Send + Sync {
    /// Called once per report, from a worker task or from
    /// [`WorkerPool::drain`].
    fn record(&self, report: &Report, result: &DeliveryResult);
}

/// What happened during a [`WorkerPool::drain`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainSummary {
    /// Reports delivered while draining.
    pub delivered: u64,
    /// Reports that failed for good while draining.
    pub failed: u64,
    /// Reports abandoned at the deadline: sends cut short, plus entries never
    /// started.
    pub dropped: u64,
}

/// Fixed set of background tasks that pop entries from a [`DeliveryQueue`] and
/// deliver them through a [`Sender`].
pub struct WorkerPool {
    queue: Arc<DeliveryQueue>,
    sink: Arc<dyn OutcomeSink>,
    counters: Arc<PoolCounters>,
    abort: Latch,
    handles: Vec<JoinHandle<()>>,
}

#[derive(Debug, Default)]
struct PoolCounters {
    delivered: AtomicU64,
    failed: AtomicU64,
    abandoned: AtomicU64,
}

impl PoolCounters {
    fn count(&self, result: &DeliveryResult) {
        let counter = match result {
            DeliveryResult::Delivered { .. } => &self.delivered,
            DeliveryResult::Failed { .. } => &self.failed,
            DeliveryResult::Abandoned { .. } => &self.abandoned,
        };

        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DrainSummary {
        DrainSummary {
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.abandoned.load(Ordering::Relaxed),
        }
    }
}

impl WorkerPool {
    /// Spawns `workers` tasks (at least one) on the current tokio runtime.
    pub fn start(
        queue: Arc<DeliveryQueue>,
        sender: Sender,
        workers: usize,
        sink: Arc<dyn OutcomeSink>,
    ) -> Self {
        let abort = Latch::new();
        let counters = Arc::new(PoolCounters::default());
        let workers = workers.max(1);

        let handles = (0..workers)
            .map(|index| {
                let worker = Worker {
                    index,
                    queue: queue.clone(),
                    sender: sender.clone(),
                    sink: sink.clone(),
                    counters: counters.clone(),
                    abort: abort.gate(),
                };

                tokio::spawn(worker.serve())
            })
            .collect();

        debug!(workers, capacity = queue.capacity(), "Delivery workers started");

        Self {
            queue,
            sink,
            counters,
            abort,
            handles,
        }
    }

    /// The queue this pool drains.
    pub fn queue(&self) -> &Arc<DeliveryQueue> {
        &self.queue
    }

    /// Closes the queue and lets the workers deliver what is queued or in
    /// flight until `deadline`. At the deadline, in-flight sends are cancelled
    /// and whatever remains queued is dropped; both count as dropped and are
    /// reported to the sink as [`DeliveryResult::Abandoned`].
    pub async fn drain(self, deadline: Instant) -> DrainSummary {
        let before = self.counters.snapshot();

        self.queue.close();
        self.abort.release_at(deadline);

        let mut workers = self.handles.into_iter().collect::<FuturesUnordered<_>>();
        while let Some(joined) = workers.next().await {
            if let Err(join_error) = joined {
                error!(error = %join_error, "Delivery worker terminated abnormally");
            }
        }

        // Stops the deadline timer if everything finished early.
        self.abort.release();

        for entry in self.queue.take_all() {
            let result = DeliveryResult::Abandoned {
                attempts: entry.attempts,
            };
            self.counters.count(&result);
            self.sink.record(&entry.report, &result);
        }

        let after = self.counters.snapshot();
        let summary = DrainSummary {
            delivered: after.delivered - before.delivered,
            failed: after.failed - before.failed,
            dropped: after.dropped - before.dropped,
        };

        if summary.dropped > 0 {
            warn!(
                delivered = summary.delivered,
                failed = summary.failed,
                dropped = summary.dropped,
                "Delivery queue drained with reports dropped at deadline",
            );
        } else {
            info!(
                delivered = summary.delivered,
                failed = summary.failed,
                "Delivery queue drained",
            );
        }

        summary
    }
}

struct Worker {
    index: usize,
    queue: Arc<DeliveryQueue>,
    sender: Sender,
    sink: Arc<dyn OutcomeSink>,
    counters: Arc<PoolCounters>,
    abort: Gate,
}

impl Worker {
    async fn serve(self) {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.abort.opened() => break,
                next = self.queue.pop() => next,
            };

            let Some(mut entry) = next else {
                break;
            };

            let result = self.deliver(&mut entry).await;
            self.counters.count(&result);
            self.sink.record(&entry.report, &result);
        }

        debug!(worker = self.index, "Delivery worker stopped");
    }

    async fn deliver(&self, entry: &mut QueueEntry) -> DeliveryResult {
        let QueueEntry {
            report, attempts, ..
        } = &mut *entry;

        let completed = tokio::select! {
            biased;
            _ = self.abort.opened() => None,
            result = self.sender.send_counted(report, attempts) => Some(result),
        };

        match completed {
            Some(result) => result,
            None => {
                debug!(
                    worker = self.index,
                    report_kind = entry.report.kind(),
                    attempts = entry.attempts,
                    "In-flight delivery cancelled at deadline",
                );
                DeliveryResult::Abandoned {
                    attempts: entry.attempts,
                }
            }
        }
    }
}
