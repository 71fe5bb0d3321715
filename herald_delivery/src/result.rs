use std::fmt::{Display, Formatter};
use std::time::Duration;
use thiserror::Error;

/// A failed delivery attempt, classified by whether retrying could help.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The attempt may succeed if repeated later.
    #[error("transient delivery failure: {0}")]
    Transient(TransientCause),

    /// Repeating the attempt will not help.
    #[error("permanent delivery failure: {0}")]
    Permanent(PermanentCause),
}

/// Why a delivery attempt failed in a retryable way.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransientCause {
    /// The connection could not be made or broke down.
    #[error("network error: {0}")]
    Network(String),

    /// The attempt did not complete in time.
    #[error("attempt timed out")]
    Timeout,

    /// The backend answered with a 5xx status.
    #[error("server error (status {0})")]
    ServerError(u16),

    /// The backend asked to slow down, optionally saying for how long.
    #[error("rate limited")]
    RateLimited {
        /// The backend's `Retry-After` hint.
        retry_after: Option<Duration>,
    },
}

/// Why a delivery attempt failed in a non-retryable way.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermanentCause {
    /// The backend rejected the credentials (401/403).
    #[error("authentication rejected (status {0})")]
    Auth(u16),

    /// The backend rejected the report itself, or it could not be encoded.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Terminal outcome of delivering one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    /// The backend accepted the report.
    Delivered {
        /// Attempts made, including the successful one.
        attempts: u32,
    },

    /// Delivery was given up: a permanent failure, or the retry budget ran out.
    Failed {
        /// Attempts made.
        attempts: u32,
        /// The last failure.
        error: TransportError,
    },

    /// Delivery was cut short by shutdown, before or during an attempt.
    Abandoned {
        /// Attempts started before abandonment.
        attempts: u32,
    },
}

impl DeliveryResult {
    /// Reports whether the report reached the backend.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// Number of attempts made.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Delivered { attempts }
            | Self::Failed { attempts, .. }
            | Self::Abandoned { attempts } => *attempts,
        }
    }

    /// The final error, for failed deliveries.
    pub fn error(&self) -> Option<&TransportError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl Display for DeliveryResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delivered { attempts } => write!(f, "delivered after {} attempt(s)", attempts),
            Self::Failed { attempts, error } => {
                write!(f, "failed after {} attempt(s): {}", attempts, error)
            }
            Self::Abandoned { attempts } => {
                write!(f, "abandoned at shutdown after {} attempt(s)", attempts)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display() {
        // Given
        let failed = DeliveryResult::Failed {
            attempts: 4,
            error: TransportError::Transient(TransientCause::ServerError(503)),
        };

        // Then
        assert_eq!(
            failed.to_string(),
            "failed after 4 attempt(s): transient delivery failure: server error (status 503)",
        );
        assert_eq!(failed.attempts(), 4);
        assert!(!failed.is_delivered());
        assert!(DeliveryResult::Delivered { attempts: 1 }.is_delivered());
    }
}
