use crate::TransportError;
use async_trait::async_trait;
use herald_core::Report;
use std::sync::Arc;

/// Performs one outbound delivery attempt of a report.
///
/// Implementations make exactly one call per invocation and classify its
/// failure; retries, backoff and per-attempt timeouts are the
/// [`Sender`](crate::Sender)'s business.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Attempts to hand the report over to the backend.
    async fn transmit(&self, report: &Report) -> Result<(), TransportError>;

    /// Returns a transport to the same backend that shares no connections
    /// with this one, for use on another runtime while this transport's
    /// runtime may be blocked.
    ///
    /// `None` means this transport holds no runtime-bound state and can be
    /// used from anywhere as is.
    fn detached(&self) -> Option<Arc<dyn Transport>> {
        None
    }
}
