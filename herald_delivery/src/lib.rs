#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Classified delivery failures and terminal results.
mod result;
pub use self::result::{DeliveryResult, PermanentCause, TransientCause, TransportError};

/// The outbound call seam.
mod transport;
pub use self::transport::Transport;

/// HTTP implementation of the transport.
#[cfg(feature = "http")]
mod http;
#[cfg(feature = "http")]
pub use self::http::{HttpTransport, HttpTransportError, classify_status};

/// Delivery of one report with retries.
mod sender;
pub use self::sender::{Sender, SenderSettings};

/// Bounded report queue.
mod queue;
pub use self::queue::{DeliveryQueue, EnqueueOutcome, OverflowPolicy, QueueEntry};

/// Background workers draining the queue.
mod pool;
pub use self::pool::{DrainSummary, OutcomeSink, WorkerPool};
