use herald_core::Report;
use herald_delivery::{DeliveryResult, OutcomeSink};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, warn};

/// Callback receiving every terminal delivery result.
pub(crate) type Listener = Arc<dyn Fn(&Report, &DeliveryResult) + Send + Sync>;

/// Point-in-time view of a [`Notifier`](crate::Notifier)'s counters.
///
/// Every fault handed to the notifier ends up in exactly one of `ignored`,
/// `malformed`, `discarded`, `rejected`, or (once queued or sent directly)
/// one of `delivered`, `dead_lettered`, `dropped`, or among the `evicted`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NotifierStats {
    /// Reports accepted into the delivery queue.
    pub accepted: u64,
    /// Reports discarded by a filter.
    pub discarded: u64,
    /// Faults dropped because the environment is ignored.
    pub ignored: u64,
    /// Faults that could not be normalized.
    pub malformed: u64,
    /// Queued reports evicted to make room for newer ones.
    pub evicted: u64,
    /// Reports refused by a full or closed queue.
    pub rejected: u64,
    /// Reports the backend accepted.
    pub delivered: u64,
    /// Reports given up on after a permanent failure or exhausted retries.
    pub dead_lettered: u64,
    /// Reports abandoned at shutdown.
    pub dropped: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) accepted: AtomicU64,
    pub(crate) discarded: AtomicU64,
    pub(crate) ignored: AtomicU64,
    pub(crate) malformed: AtomicU64,
    pub(crate) evicted: AtomicU64,
    pub(crate) rejected: AtomicU64,
    delivered: AtomicU64,
    dead_lettered: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> NotifierStats {
        NotifierStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Counts terminal results and forwards them to the listener, if any.
///
/// Held by the worker pool as well as by the notifier, so it must not refer
/// back to the notifier.
pub(crate) struct Outcomes {
    pub(crate) counters: Arc<Counters>,
    pub(crate) listener: Option<Listener>,
}

impl OutcomeSink for Outcomes {
    fn record(&self, report: &Report, result: &DeliveryResult) {
        match result {
            DeliveryResult::Delivered { .. } => Counters::bump(&self.counters.delivered),
            DeliveryResult::Failed { attempts, error } => {
                Counters::bump(&self.counters.dead_lettered);
                warn!(
                    report_kind = report.kind(),
                    attempts,
                    error = %error,
                    "Report dead-lettered",
                );
            }
            DeliveryResult::Abandoned { .. } => Counters::bump(&self.counters.dropped),
        }

        let Some(listener) = self.listener.as_ref() else {
            return;
        };

        if catch_unwind(AssertUnwindSafe(|| listener(report, result))).is_err() {
            error!(
                report_kind = report.kind(),
                "Delivery result listener panicked",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{Context, Normalizer, RawFault};
    use herald_delivery::{PermanentCause, TransportError};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    fn make_report() -> Report {
        Normalizer::default()
            .normalize(&RawFault::new("Boom", "it broke"), Context::new())
            .unwrap()
    }

    #[test]
    fn results_are_counted_and_forwarded() {
        // Given
        let seen = Arc::new(Mutex::new(Vec::new()));
        let listener: Listener = {
            let seen = seen.clone();
            Arc::new(move |_report: &Report, result: &DeliveryResult| {
                seen.lock().push(result.clone())
            })
        };
        let outcomes = Outcomes {
            counters: Arc::new(Counters::default()),
            listener: Some(listener),
        };
        let failed = DeliveryResult::Failed {
            attempts: 1,
            error: TransportError::Permanent(PermanentCause::Auth(401)),
        };

        // When
        outcomes.record(&make_report(), &DeliveryResult::Delivered { attempts: 1 });
        outcomes.record(&make_report(), &failed);
        outcomes.record(&make_report(), &DeliveryResult::Abandoned { attempts: 0 });

        // Then
        let stats = outcomes.counters.snapshot();
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.dead_lettered, 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(seen.lock().len(), 3);
    }

    fn exploding_listener(_report: &Report, _result: &DeliveryResult) {
        panic!("listener bug");
    }

    #[test]
    fn panicking_listener_is_contained() {
        // Given
        let outcomes = Outcomes {
            counters: Arc::new(Counters::default()),
            listener: Some(Arc::new(exploding_listener)),
        };

        // When
        outcomes.record(&make_report(), &DeliveryResult::Delivered { attempts: 1 });

        // Then
        assert_eq!(outcomes.counters.snapshot().delivered, 1);
    }
}
