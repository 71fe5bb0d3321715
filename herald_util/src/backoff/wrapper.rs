use crate::BackoffConfig;
use backoff::backoff::Backoff as InnerBackoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use parking_lot::Mutex as SyncMutex;
use std::time::Duration;

/// Stateful sequence of retry delays built from a [`BackoffConfig`].
///
/// Wraps [`ExponentialBackoff`] behind a light-weight mutex so that it can be
/// advanced through a shared reference. The sequence never runs out: the
/// number of retries is bounded by the caller, not by elapsed time.
pub struct Backoff {
    inner: SyncMutex<ExponentialBackoff>,
    max_interval: Duration,
}

impl Backoff {
    /// Builds a fresh [`Backoff`], positioned before its first delay.
    pub fn new(config: impl AsRef<BackoffConfig>) -> Self {
        let config = config.as_ref();
        let inner = ExponentialBackoffBuilder::new()
            .with_initial_interval(config.initial_interval())
            .with_max_interval(config.max_interval())
            .with_randomization_factor(config.randomization_factor())
            .with_multiplier(config.multiplier())
            .with_max_elapsed_time(None)
            .build();

        Self {
            inner: SyncMutex::new(inner),
            max_interval: config.max_interval(),
        }
    }

    /// Returns the next delay and advances the sequence.
    pub fn next(&self) -> Duration {
        self.inner
            .lock()
            .next_backoff()
            .unwrap_or(self.max_interval)
    }

    /// Sleeps for the next delay.
    pub async fn sleep_next(&self) {
        tokio::time::sleep(self.next()).await;
    }

    /// Caps an externally suggested delay (e.g. a server's `Retry-After`) at
    /// this backoff's max interval.
    pub fn cap(&self, suggested: Duration) -> Duration {
        suggested.min(self.max_interval)
    }

    /// Rewinds the sequence to the initial interval.
    pub fn reset(&self) {
        self.inner.lock().reset();
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
