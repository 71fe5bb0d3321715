use crate::integration::Capabilities;
use herald_core::{
    Context, Fault, FilterChain, FilterOutcome, MalformedInputError, Normalizer, Report,
};
use herald_delivery::{
    DeliveryQueue, DeliveryResult, DrainSummary, EnqueueOutcome, HttpTransportError,
    OutcomeSink, Sender, TransientCause, TransportError, WorkerPool,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::TryCurrentError;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Implements the [`NotifierBuilder`].
pub mod builder;

/// Implements the [`Event`] handed to [`Notifier::ingest`].
pub mod event;

/// Implements the counters behind [`Notifier::stats`].
pub mod stats;

use self::builder::NotifierBuilder;
use self::event::Event;
use self::stats::{Counters, NotifierStats, Outcomes};

/// Captures faults, filters them into reports and delivers them to the
/// tracking backend.
///
/// A notifier is cheap to clone; clones share the same queue, workers and
/// counters. Build one with [`Notifier::builder`] from inside a tokio runtime,
/// and [shut it down](Notifier::shutdown) before the runtime goes away to
/// flush what is still queued.
///
/// Nothing on the asynchronous path ([`notify`](Notifier::notify),
/// [`ingest`](Notifier::ingest)) returns an error or blocks: the returned
/// [`Submission`] only says what happened to the report locally.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) normalizer: Normalizer,
    pub(crate) chain: FilterChain,
    pub(crate) gated_environment: Option<String>,
    pub(crate) queue: Arc<DeliveryQueue>,
    pub(crate) sender: Sender,
    pub(crate) sync_timeout: Duration,
    pub(crate) drain_timeout: Duration,
    pub(crate) pool: Mutex<Option<WorkerPool>>,
    pub(crate) counters: Arc<Counters>,
    pub(crate) outcomes: Arc<Outcomes>,
    pub(crate) capabilities: Capabilities,
}

/// A [`Notifier`] could not be built.
#[derive(Debug, Error)]
pub enum NotifierError {
    /// The HTTP transport could not be set up from the configured endpoint.
    #[error("failed to set up the transport: {0}")]
    Transport(#[from] HttpTransportError),

    /// A filter declared in configuration has an invalid pattern.
    #[error("filter `{filter}` has an invalid pattern: {source}")]
    InvalidFilter {
        /// Name of the offending filter.
        filter: String,
        /// The pattern error.
        #[source]
        source: regex::Error,
    },

    /// The notifier was built outside of a tokio runtime, so its workers
    /// cannot be started.
    #[error("a notifier must be built from within a tokio runtime")]
    NoRuntime(#[source] TryCurrentError),
}

/// Why a fault never turned into a report headed for the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skipped {
    /// Reports from this environment are ignored.
    IgnoredEnvironment(String),
    /// The named filter discarded the report.
    Discarded {
        /// Name of the discarding filter.
        filter: String,
    },
    /// The fault could not be normalized.
    Malformed(MalformedInputError),
}

/// What happened to a fault handed over for asynchronous delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The report was queued.
    Queued,
    /// The report was queued, evicting the oldest queued report.
    QueuedEvicting,
    /// The queue was full (or closed) and refused the report.
    Rejected,
    /// No report was queued.
    Skipped(Skipped),
}

impl Submission {
    /// Reports whether the report made it into the queue.
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued | Self::QueuedEvicting)
    }
}

impl Notifier {
    /// Starts building a notifier from the given configuration.
    pub fn builder(config: crate::NotifierConfig) -> NotifierBuilder {
        NotifierBuilder::new(config)
    }

    pub(crate) fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Reports the fault in the background: normalizes and filters it on the
    /// calling thread, then queues it for the delivery workers.
    pub fn notify(&self, fault: &dyn Fault, context: Context) -> Submission {
        self.ingest(Event::new(fault).with_context(context))
    }

    /// Same as [`notify`](Notifier::notify), for an [`Event`] carrying a tag
    /// or a performance attachment. This is the entry point of integration
    /// adapters.
    pub fn ingest(&self, event: Event<'_>) -> Submission {
        let report = match self.prepare(event) {
            Ok(report) => report,
            Err(skipped) => return Submission::Skipped(skipped),
        };

        let report_kind = report.kind().to_string();
        let counters = &self.inner.counters;

        match self.inner.queue.enqueue(report) {
            EnqueueOutcome::Accepted => {
                Counters::bump(&counters.accepted);
                debug!(report_kind, "Report queued");
                Submission::Queued
            }
            EnqueueOutcome::Evicted(evicted) => {
                Counters::bump(&counters.accepted);
                Counters::bump(&counters.evicted);
                warn!(
                    report_kind,
                    evicted_kind = evicted.report().kind(),
                    capacity = self.inner.queue.capacity(),
                    "Delivery queue full; evicted the oldest report",
                );
                Submission::QueuedEvicting
            }
            EnqueueOutcome::Rejected(_) => {
                Counters::bump(&counters.rejected);
                warn!(
                    report_kind,
                    capacity = self.inner.queue.capacity(),
                    closed = self.inner.queue.is_closed(),
                    "Delivery queue refused a report",
                );
                Submission::Rejected
            }
        }
    }

    /// Reports the fault and waits for the delivery to finish, retries
    /// included, for at most the configured sync timeout. The queue is
    /// bypassed.
    ///
    /// The report is built when this is called; the returned future only
    /// delivers it, and does not borrow the fault.
    pub fn notify_sync(
        &self,
        fault: &dyn Fault,
        context: Context,
    ) -> impl Future<Output = Result<DeliveryResult, Skipped>> + use<> {
        self.ingest_sync(Event::new(fault).with_context(context))
    }

    /// Same as [`notify_sync`](Notifier::notify_sync), for an [`Event`].
    pub fn ingest_sync(
        &self,
        event: Event<'_>,
    ) -> impl Future<Output = Result<DeliveryResult, Skipped>> + use<> {
        let prepared = self.prepare(event);
        let inner = self.inner.clone();

        async move {
            let report = prepared?;
            let result = inner.sender.send_within(&report, inner.sync_timeout).await;
            inner.outcomes.record(&report, &result);

            Ok(result)
        }
    }

    /// Same as [`notify_sync`](Notifier::notify_sync), for call sites that
    /// cannot await, such as panic hooks and exit handlers. The delivery runs
    /// on a helper thread with a runtime and connections of its own, so this
    /// may also be called from within a runtime, including from the only
    /// thread of a current-thread runtime.
    pub fn notify_blocking(
        &self,
        fault: &dyn Fault,
        context: Context,
    ) -> Result<DeliveryResult, Skipped> {
        self.ingest_blocking(
            Event::new(fault).with_context(context),
            self.inner.sync_timeout,
        )
    }

    pub(crate) fn ingest_blocking(
        &self,
        event: Event<'_>,
        limit: Duration,
    ) -> Result<DeliveryResult, Skipped> {
        let report = self.prepare(event)?;

        let joined = std::thread::scope(|scope| {
            scope
                .spawn(|| self.send_on_own_runtime(&report, limit))
                .join()
        });

        let result = joined.unwrap_or_else(|_| {
            error!(
                report_kind = report.kind(),
                "Blocking delivery thread panicked",
            );
            DeliveryResult::Abandoned { attempts: 0 }
        });

        self.inner.outcomes.record(&report, &result);

        Ok(result)
    }

    fn send_on_own_runtime(&self, report: &Report, limit: Duration) -> DeliveryResult {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build();

        match runtime {
            Ok(runtime) => {
                let sender = self.inner.sender.detached();
                runtime.block_on(sender.send_within(report, limit))
            }
            Err(runtime_error) => {
                error!(
                    report_kind = report.kind(),
                    error = %runtime_error,
                    "Failed to start a runtime for blocking delivery",
                );
                DeliveryResult::Failed {
                    attempts: 0,
                    error: TransportError::Transient(TransientCause::Network(
                        runtime_error.to_string(),
                    )),
                }
            }
        }
    }

    /// Stops accepting reports and delivers what is queued or in flight until
    /// `deadline`. Whatever is left at the deadline is dropped.
    ///
    /// Only the first call drains; later calls return an empty summary.
    pub async fn shutdown(&self, deadline: Instant) -> DrainSummary {
        let pool = self.inner.pool.lock().take();

        match pool {
            Some(pool) => pool.drain(deadline).await,
            None => {
                debug!("Notifier already shut down");
                DrainSummary::default()
            }
        }
    }

    /// [Shuts down](Notifier::shutdown) with the configured drain timeout.
    pub async fn close(&self) -> DrainSummary {
        self.shutdown(Instant::now() + self.inner.drain_timeout)
            .await
    }

    /// Snapshot of the notifier's counters.
    pub fn stats(&self) -> NotifierStats {
        self.inner.counters.snapshot()
    }

    /// The capabilities declared when the notifier was built.
    pub fn capabilities(&self) -> &Capabilities {
        &self.inner.capabilities
    }

    /// The environment stamped on reports.
    pub fn environment(&self) -> Option<&str> {
        self.inner.normalizer.environment()
    }

    /// Number of reports waiting in the queue.
    pub fn queued(&self) -> usize {
        self.inner.queue.len()
    }

    /// Turns an event into a report ready for delivery, or says why not.
    fn prepare(&self, event: Event<'_>) -> Result<Report, Skipped> {
        let inner = &*self.inner;

        if let Some(environment) = inner.gated_environment.as_ref() {
            Counters::bump(&inner.counters.ignored);
            debug!(environment = environment.as_str(), "Environment is ignored; fault not reported");
            return Err(Skipped::IgnoredEnvironment(environment.clone()));
        }

        let Event {
            fault,
            context,
            tag,
            performance,
        } = event;

        let mut report = match inner.normalizer.normalize(fault, context) {
            Ok(report) => report,
            Err(malformed) => {
                Counters::bump(&inner.counters.malformed);
                warn!(error = %malformed, "Fault could not be normalized; dropping it");
                return Err(Skipped::Malformed(malformed));
            }
        };

        report.set_tag(tag);
        report.set_performance(performance);

        match inner.chain.run(report) {
            FilterOutcome::Passed(report) => Ok(report),
            FilterOutcome::Discarded { filter } => {
                Counters::bump(&inner.counters.discarded);
                debug!(filter, "Report discarded by filter");
                Err(Skipped::Discarded { filter })
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Lets workers of a notifier that was never shut down finish the
        // queue and exit.
        self.queue.close();
    }
}
