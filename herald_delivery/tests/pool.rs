use async_trait::async_trait;
use herald_core::{Context, Normalizer, RawFault, Report};
use herald_delivery::{
    DeliveryQueue, DeliveryResult, DrainSummary, OutcomeSink, OverflowPolicy, Sender,
    SenderSettings, TransientCause, Transport, TransportError, WorkerPool,
};
use herald_util::BackoffConfig;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Takes `latency` per call; fails transiently for reports whose message
/// starts with `flaky`.
struct SlowBackend {
    latency: Duration,
    calls: AtomicUsize,
}

#[async_trait]
impl Transport for SlowBackend {
    async fn transmit(&self, report: &Report) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(self.latency).await;

        if report.message().starts_with("flaky") {
            return Err(TransportError::Transient(TransientCause::ServerError(502)));
        }

        Ok(())
    }
}

#[derive(Default)]
struct Recorder {
    outcomes: Mutex<Vec<(String, DeliveryResult)>>,
}

impl OutcomeSink for Recorder {
    fn record(&self, report: &Report, result: &DeliveryResult) {
        self.outcomes
            .lock()
            .push((report.message().to_string(), result.clone()));
    }
}

impl Recorder {
    fn delivered(&self) -> Vec<String> {
        self.outcomes
            .lock()
            .iter()
            .filter(|(_, result)| result.is_delivered())
            .map(|(message, _)| message.clone())
            .collect()
    }

    fn count_where(&self, predicate: impl Fn(&DeliveryResult) -> bool) -> usize {
        self.outcomes
            .lock()
            .iter()
            .filter(|(_, result)| predicate(result))
            .count()
    }
}

fn make_report(message: String) -> Report {
    Normalizer::default()
        .normalize(&RawFault::new("Boom", message), Context::new())
        .unwrap()
}

fn start_pool(
    latency: Duration,
    workers: usize,
    messages: impl IntoIterator<Item = String>,
) -> (WorkerPool, Arc<SlowBackend>, Arc<Recorder>) {
    let backend = Arc::new(SlowBackend {
        latency,
        calls: AtomicUsize::new(0),
    });
    let recorder = Arc::new(Recorder::default());
    let queue = Arc::new(DeliveryQueue::new(100, OverflowPolicy::DropOldest));
    for message in messages {
        queue.enqueue(make_report(message));
    }

    let settings = SenderSettings {
        max_retries: 1,
        attempt_timeout: Duration::from_secs(1),
        backoff: BackoffConfig::new(Duration::from_millis(50), Duration::from_secs(1), 0.0, 2.0),
    };
    let sender = Sender::new(backend.clone(), settings);
    let pool = WorkerPool::start(queue, sender, workers, recorder.clone());

    (pool, backend, recorder)
}

fn numbered(count: usize) -> impl Iterator<Item = String> {
    (1..=count).map(|n| format!("report-{}", n))
}

#[tokio::test(start_paused = true)]
async fn drain_delivers_everything_when_time_allows() {
    // Given
    let (pool, backend, recorder) = start_pool(Duration::from_millis(100), 1, numbered(10));
    let start = Instant::now();

    // When
    let summary = pool.drain(start + Duration::from_secs(5)).await;

    // Then
    assert_eq!(
        summary,
        DrainSummary {
            delivered: 10,
            failed: 0,
            dropped: 0,
        },
    );
    assert_eq!(backend.calls.load(Ordering::Relaxed), 10);
    assert_eq!(recorder.delivered(), numbered(10).collect::<Vec<_>>());
    assert_eq!(start.elapsed(), Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn drain_cuts_off_at_deadline() {
    // Given
    let (pool, backend, recorder) = start_pool(Duration::from_millis(100), 1, numbered(10));
    let start = Instant::now();

    // When
    let summary = pool.drain(start + Duration::from_millis(650)).await;

    // Then
    assert_eq!(
        summary,
        DrainSummary {
            delivered: 6,
            failed: 0,
            dropped: 4,
        },
    );
    assert_eq!(recorder.delivered(), numbered(6).collect::<Vec<_>>());
    assert_eq!(
        recorder.count_where(|result| *result == DeliveryResult::Abandoned { attempts: 1 }),
        1,
    );
    assert_eq!(
        recorder.count_where(|result| *result == DeliveryResult::Abandoned { attempts: 0 }),
        3,
    );
    assert_eq!(backend.calls.load(Ordering::Relaxed), 7);
    assert_eq!(start.elapsed(), Duration::from_millis(650));
}

#[tokio::test(start_paused = true)]
async fn workers_share_the_queue() {
    // Given
    let (pool, _backend, recorder) = start_pool(Duration::from_millis(100), 4, numbered(8));
    let start = Instant::now();

    // When
    let summary = pool.drain(start + Duration::from_secs(5)).await;

    // Then
    assert_eq!(summary.delivered, 8);
    assert_eq!(recorder.delivered().len(), 8);
    assert_eq!(start.elapsed(), Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn failures_are_reported_as_dead_letters() {
    // Given
    let messages = ["report-1", "flaky-2", "report-3"].map(String::from);
    let (pool, backend, recorder) = start_pool(Duration::from_millis(10), 1, messages);
    let start = Instant::now();

    // When
    let summary = pool.drain(start + Duration::from_secs(5)).await;

    // Then
    assert_eq!(
        summary,
        DrainSummary {
            delivered: 2,
            failed: 1,
            dropped: 0,
        },
    );
    assert_eq!(backend.calls.load(Ordering::Relaxed), 4);
    assert_eq!(
        recorder.count_where(|result| matches!(
            result,
            DeliveryResult::Failed { attempts: 2, .. }
        )),
        1,
    );
}

#[tokio::test(start_paused = true)]
async fn reports_enqueued_while_running_are_delivered() {
    // Given
    let (pool, _backend, recorder) = start_pool(Duration::from_millis(10), 2, numbered(0));
    let queue = pool.queue().clone();

    // When
    tokio::time::sleep(Duration::from_millis(100)).await;
    queue.enqueue(make_report("late-1".to_string()));
    queue.enqueue(make_report("late-2".to_string()));
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Then
    let mut delivered = recorder.delivered();
    delivered.sort();
    assert_eq!(delivered, vec!["late-1", "late-2"]);

    // When
    let summary = pool.drain(Instant::now() + Duration::from_secs(1)).await;

    // Then
    assert_eq!(summary, DrainSummary::default());
    assert!(queue.is_closed());
}
