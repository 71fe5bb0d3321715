use herald_core::Report;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;
use tokio::time::Instant;

/// What to do with a new report when the queue is full.
#[derive(herald_factory::Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[herald(eq_fn = herald_deserialize::Slug::eq_as_slugs)]
pub enum OverflowPolicy {
    /// Evict the oldest queued report to make room.
    #[default]
    #[herald(alias = "oldest", alias = "drop_head")]
    DropOldest,

    /// Refuse the new report.
    #[herald(alias = "newest", alias = "reject", alias = "drop_new")]
    RejectNew,
}

/// A report waiting for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub(crate) report: Report,
    pub(crate) enqueued_at: Instant,
    pub(crate) attempts: u32,
}

impl QueueEntry {
    /// Wraps a report, stamping the current instant.
    pub fn new(report: Report) -> Self {
        Self {
            report,
            enqueued_at: Instant::now(),
            attempts: 0,
        }
    }

    /// The queued report.
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Unwraps the queued report.
    pub fn into_report(self) -> Report {
        self.report
    }

    /// When the report entered the queue.
    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }

    /// Delivery attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Retries started so far (attempts beyond the first).
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Result of [`DeliveryQueue::enqueue`].
#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    /// The entry was queued.
    Accepted,
    /// The entry was queued; this older entry was evicted to make room.
    Evicted(QueueEntry),
    /// The entry was refused, either because the queue is full under
    /// [`OverflowPolicy::RejectNew`] or because the queue is closed.
    Rejected(QueueEntry),
}

/// Bounded FIFO of [`QueueEntry`]s shared by producers and delivery workers.
///
/// Enqueueing never waits: a full queue applies its [`OverflowPolicy`]
/// immediately. Consumers wait asynchronously in [`pop`](Self::pop).
#[derive(Debug)]
pub struct DeliveryQueue {
    state: Mutex<QueueState>,
    available: Notify,
    capacity: usize,
    policy: OverflowPolicy,
}

#[derive(Debug)]
struct QueueState {
    entries: VecDeque<QueueEntry>,
    closed: bool,
}

impl DeliveryQueue {
    /// Creates an open queue holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);

        Self {
            state: Mutex::new(QueueState {
                entries: VecDeque::with_capacity(capacity.min(1024)),
                closed: false,
            }),
            available: Notify::new(),
            capacity,
            policy,
        }
    }

    /// Maximum number of queued entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The configured overflow policy.
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Reports whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Reports whether the queue refuses new entries.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Queues the report, applying the overflow policy if the queue is full.
    pub fn enqueue(&self, report: Report) -> EnqueueOutcome {
        self.push(QueueEntry::new(report))
    }

    /// Queues an existing entry, applying the overflow policy if the queue is
    /// full.
    pub fn push(&self, entry: QueueEntry) -> EnqueueOutcome {
        let outcome = {
            let mut state = self.state.lock();

            if state.closed {
                return EnqueueOutcome::Rejected(entry);
            }

            if state.entries.len() < self.capacity {
                state.entries.push_back(entry);
                EnqueueOutcome::Accepted
            } else {
                match self.policy {
                    OverflowPolicy::RejectNew => return EnqueueOutcome::Rejected(entry),
                    OverflowPolicy::DropOldest => {
                        let evicted = state.entries.pop_front();
                        state.entries.push_back(entry);
                        match evicted {
                            Some(evicted) => EnqueueOutcome::Evicted(evicted),
                            None => EnqueueOutcome::Accepted,
                        }
                    }
                }
            }
        };

        self.available.notify_one();

        outcome
    }

    /// Takes the oldest entry, waiting for one if necessary. Returns `None`
    /// once the queue is closed and empty.
    pub async fn pop(&self) -> Option<QueueEntry> {
        loop {
            let notified = self.available.notified();

            {
                let mut state = self.state.lock();
                if let Some(entry) = state.entries.pop_front() {
                    return Some(entry);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Takes the oldest entry without waiting.
    pub fn try_pop(&self) -> Option<QueueEntry> {
        self.state.lock().entries.pop_front()
    }

    /// Stops accepting entries and wakes every waiting consumer. Entries
    /// already queued can still be popped.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_waiters();
    }

    /// Removes and returns everything still queued.
    pub fn take_all(&self) -> Vec<QueueEntry> {
        self.state.lock().entries.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{Context, Normalizer, RawFault};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn make_report(message: &str) -> Report {
        Normalizer::default()
            .normalize(&RawFault::new("Boom", message), Context::new())
            .unwrap()
    }

    fn messages(entries: Vec<QueueEntry>) -> Vec<String> {
        entries
            .into_iter()
            .map(|entry| entry.report().message().to_string())
            .collect()
    }

    #[test]
    fn drop_oldest_evicts_head() {
        // Given
        let queue = DeliveryQueue::new(2, OverflowPolicy::DropOldest);
        queue.enqueue(make_report("1"));
        queue.enqueue(make_report("2"));

        // When
        let outcome = queue.enqueue(make_report("3"));

        // Then
        let EnqueueOutcome::Evicted(evicted) = outcome else {
            panic!("expected eviction, got {:?}", outcome);
        };
        assert_eq!(evicted.report().message(), "1");
        assert_eq!(queue.len(), 2);
        assert_eq!(messages(queue.take_all()), vec!["2", "3"]);
    }

    #[test]
    fn reject_new_keeps_contents() {
        // Given
        let queue = DeliveryQueue::new(1, OverflowPolicy::RejectNew);
        assert_eq!(queue.enqueue(make_report("1")), EnqueueOutcome::Accepted);

        // When
        let outcome = queue.enqueue(make_report("2"));

        // Then
        let EnqueueOutcome::Rejected(rejected) = outcome else {
            panic!("expected rejection, got {:?}", outcome);
        };
        assert_eq!(rejected.report().message(), "2");
        assert_eq!(messages(queue.take_all()), vec!["1"]);
    }

    #[test]
    fn closed_queue_rejects() {
        // Given
        let queue = DeliveryQueue::new(10, OverflowPolicy::DropOldest);
        queue.close();

        // When
        let outcome = queue.enqueue(make_report("late"));

        // Then
        assert!(matches!(outcome, EnqueueOutcome::Rejected(_)));
        assert!(queue.is_empty());
        assert!(queue.is_closed());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        assert_eq!(DeliveryQueue::new(0, OverflowPolicy::RejectNew).capacity(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pop_waits_for_entries() {
        // Given
        let queue = Arc::new(DeliveryQueue::new(10, OverflowPolicy::DropOldest));
        let producer = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            producer.enqueue(make_report("late"));
        });

        // When
        let entry = queue.pop().await;

        // Then
        assert_eq!(entry.unwrap().report().message(), "late");
    }

    #[tokio::test]
    async fn close_wakes_waiting_consumers() {
        // Given
        let queue = Arc::new(DeliveryQueue::new(10, OverflowPolicy::DropOldest));
        let consumers = (0..3)
            .map(|_| {
                let queue = queue.clone();
                tokio::spawn(async move { queue.pop().await })
            })
            .collect::<Vec<_>>();
        tokio::task::yield_now().await;

        // When
        queue.close();

        // Then
        for consumer in consumers {
            assert_eq!(consumer.await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn closed_queue_still_yields_remaining_entries() {
        // Given
        let queue = DeliveryQueue::new(10, OverflowPolicy::DropOldest);
        queue.enqueue(make_report("1"));
        queue.close();

        // Then
        assert_eq!(queue.pop().await.unwrap().report().message(), "1");
        assert_eq!(queue.pop().await, None);
    }

    #[test]
    fn policy_from_config() {
        assert_eq!(
            serde_yml::from_str::<OverflowPolicy>("drop-oldest").unwrap(),
            OverflowPolicy::DropOldest,
        );
        assert_eq!(
            serde_yml::from_str::<OverflowPolicy>("RejectNew").unwrap(),
            OverflowPolicy::RejectNew,
        );
        assert_eq!(
            serde_yml::from_str::<OverflowPolicy>("newest").unwrap(),
            OverflowPolicy::RejectNew,
        );
        assert!(serde_yml::from_str::<OverflowPolicy>("drop_everything").is_err());
    }
}
