use crate::{DeliveryResult, TransientCause, Transport, TransportError};
use herald_core::Report;
use herald_util::{Backoff, BackoffConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Knobs of a [`Sender`].
#[derive(Debug, Clone, PartialEq)]
pub struct SenderSettings {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Upper bound on a single attempt.
    pub attempt_timeout: Duration,
    /// Delay growth between attempts.
    pub backoff: BackoffConfig,
}

impl Default for SenderSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            attempt_timeout: Duration::from_secs(10),
            backoff: BackoffConfig::default(),
        }
    }
}

/// Delivers one report at a time through a [`Transport`], with retries.
///
/// Transient failures (including attempts exceeding the attempt timeout) are
/// retried up to `max_retries` times with exponential backoff; a rate-limit
/// hint from the backend replaces the computed delay, capped at the backoff's
/// max interval. Permanent failures end the delivery at once.
#[derive(Clone)]
pub struct Sender {
    transport: Arc<dyn Transport>,
    settings: SenderSettings,
}

impl Sender {
    /// Creates a sender over the given transport.
    pub fn new(transport: Arc<dyn Transport>, settings: SenderSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// A sender with the same settings over a [detached](Transport::detached)
    /// transport, or a plain clone when the transport needs no detaching.
    pub fn detached(&self) -> Self {
        match self.transport.detached() {
            Some(transport) => Self {
                transport,
                settings: self.settings.clone(),
            },
            None => self.clone(),
        }
    }

    /// The sender's settings.
    pub fn settings(&self) -> &SenderSettings {
        &self.settings
    }

    /// Delivers the report, retrying as configured.
    pub async fn send(&self, report: &Report) -> DeliveryResult {
        let mut attempts = 0;

        self.send_counted(report, &mut attempts).await
    }

    /// Same as [`send`](Sender::send), bounded overall by `limit`. A delivery
    /// still running at the limit is cut short and reported as a transient
    /// timeout, with the attempts started so far.
    pub async fn send_within(&self, report: &Report, limit: Duration) -> DeliveryResult {
        let mut attempts = 0;

        let outcome =
            tokio::time::timeout(limit, self.send_counted(report, &mut attempts)).await;

        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    report_kind = report.kind(),
                    attempts,
                    limit = ?limit,
                    "Synchronous delivery ran out of time",
                );
                DeliveryResult::Failed {
                    attempts,
                    error: TransportError::Transient(TransientCause::Timeout),
                }
            }
        }
    }

    /// Same as [`send`](Sender::send), but keeps `attempts` up to date while
    /// running, so that a caller dropping this future mid-way still knows how
    /// many attempts were started.
    pub(crate) async fn send_counted(&self, report: &Report, attempts: &mut u32) -> DeliveryResult {
        let backoff = Backoff::new(&self.settings.backoff);

        loop {
            *attempts += 1;
            let attempt = *attempts;

            let outcome = tokio::time::timeout(
                self.settings.attempt_timeout,
                self.transport.transmit(report),
            )
            .await
            .unwrap_or(Err(TransportError::Transient(TransientCause::Timeout)));

            let cause = match outcome {
                Ok(()) => {
                    debug!(report_kind = report.kind(), attempt, "Report delivered");
                    return DeliveryResult::Delivered { attempts: attempt };
                }
                Err(error @ TransportError::Permanent(_)) => {
                    warn!(
                        report_kind = report.kind(),
                        attempt,
                        error = %error,
                        "Report rejected permanently; not retrying",
                    );
                    return DeliveryResult::Failed {
                        attempts: attempt,
                        error,
                    };
                }
                Err(TransportError::Transient(cause)) => cause,
            };

            if attempt > self.settings.max_retries {
                warn!(
                    report_kind = report.kind(),
                    attempt,
                    error = %cause,
                    "Retry budget exhausted; giving up on report",
                );
                return DeliveryResult::Failed {
                    attempts: attempt,
                    error: TransportError::Transient(cause),
                };
            }

            let delay = match cause {
                TransientCause::RateLimited {
                    retry_after: Some(hint),
                } => backoff.cap(hint),
                _ => backoff.next(),
            };

            debug!(
                report_kind = report.kind(),
                attempt,
                error = %cause,
                delay = ?delay,
                "Delivery attempt failed; retrying",
            );

            tokio::time::sleep(delay).await;
        }
    }
}
