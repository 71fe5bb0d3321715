use crate::{PermanentCause, TransientCause, Transport, TransportError};
use async_trait::async_trait;
use herald_core::Report;
use reqwest::header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use secure_string::SecureString;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Delivers reports as JSON over HTTP(S) `POST`, authenticated with a bearer
/// token.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    api_key: SecureString,
}

/// The HTTP transport could not be set up.
#[derive(Error, Debug)]
pub enum HttpTransportError {
    /// The endpoint is not a valid absolute URL.
    #[error("invalid endpoint `{endpoint}`: {source}")]
    InvalidEndpoint {
        /// The offending endpoint.
        endpoint: String,
        /// The parse error.
        source: url::ParseError,
    },

    /// The underlying HTTP client failed to initialize.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl HttpTransport {
    /// Creates a transport posting to the given endpoint.
    pub fn new(endpoint: &str, api_key: SecureString) -> Result<Self, HttpTransportError> {
        let endpoint =
            Url::parse(endpoint).map_err(|source| HttpTransportError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let client = client_builder().build().map_err(HttpTransportError::Client)?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    /// Creates a transport to the same endpoint whose client keeps no idle
    /// connections, so nothing it opens outlives the runtime that drives it.
    pub fn unpooled(&self) -> Result<Self, HttpTransportError> {
        let client = client_builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(HttpTransportError::Client)?;

        Ok(Self {
            client,
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
        })
    }

    /// The endpoint reports are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Debug for HttpTransport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &self.api_key)
            .finish()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn transmit(&self, report: &Report) -> Result<(), TransportError> {
        let body = serde_json::to_vec(report).map_err(|error| {
            TransportError::Permanent(PermanentCause::MalformedPayload(error.to_string()))
        })?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.unsecure())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        debug!(
            endpoint = self.endpoint.as_str(),
            status = status.as_u16(),
            report_kind = report.kind(),
            "Backend responded",
        );

        classify_status(status, retry_after(response.headers()))
    }

    fn detached(&self) -> Option<Arc<dyn Transport>> {
        match self.unpooled() {
            Ok(transport) => Some(Arc::new(transport)),
            Err(error) => {
                warn!(
                    endpoint = self.endpoint.as_str(),
                    error = %error,
                    "Failed to build a detached HTTP client; reusing the shared one",
                );
                None
            }
        }
    }
}

fn client_builder() -> reqwest::ClientBuilder {
    Client::builder().user_agent(concat!("herald/", env!("CARGO_PKG_VERSION")))
}

/// Maps a backend response status to a delivery outcome: 2xx succeed, 401/403
/// are permanent auth failures, 429 and 5xx are transient, every other status
/// is a permanent payload rejection.
pub fn classify_status(
    status: StatusCode,
    retry_after: Option<Duration>,
) -> Result<(), TransportError> {
    match status.as_u16() {
        200..=299 => Ok(()),
        401 | 403 => Err(TransportError::Permanent(PermanentCause::Auth(
            status.as_u16(),
        ))),
        429 => Err(TransportError::Transient(TransientCause::RateLimited {
            retry_after,
        })),
        500..=599 => Err(TransportError::Transient(TransientCause::ServerError(
            status.as_u16(),
        ))),
        other => Err(TransportError::Permanent(PermanentCause::MalformedPayload(
            format!("backend rejected report with status {}", other),
        ))),
    }
}

fn classify_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        return TransportError::Transient(TransientCause::Timeout);
    }

    TransportError::Transient(TransientCause::Network(error.to_string()))
}

/// Reads a `Retry-After` header given in seconds. Date-valued hints are
/// ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reqwest::header::HeaderValue;

    #[test]
    fn classifies_statuses() {
        let classify = |code: u16| classify_status(StatusCode::from_u16(code).unwrap(), None);

        assert_eq!(classify(200), Ok(()));
        assert_eq!(classify(202), Ok(()));
        assert_eq!(
            classify(401),
            Err(TransportError::Permanent(PermanentCause::Auth(401))),
        );
        assert_eq!(
            classify(403),
            Err(TransportError::Permanent(PermanentCause::Auth(403))),
        );
        assert_eq!(
            classify(429),
            Err(TransportError::Transient(TransientCause::RateLimited {
                retry_after: None
            })),
        );
        assert_eq!(
            classify(503),
            Err(TransportError::Transient(TransientCause::ServerError(503))),
        );
        assert!(matches!(
            classify(422),
            Err(TransportError::Permanent(PermanentCause::MalformedPayload(_))),
        ));
    }

    #[test]
    fn reads_retry_after_seconds() {
        // Given
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 7 "));

        // Then
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));

        // When
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );

        // Then
        assert_eq!(retry_after(&headers), None);
        assert_eq!(retry_after(&HeaderMap::new()), None);
    }

    #[test]
    fn rejects_invalid_endpoint() {
        // When
        let result = HttpTransport::new("not a url", SecureString::from("key"));

        // Then
        let error = result.unwrap_err();
        assert!(matches!(
            error,
            HttpTransportError::InvalidEndpoint {
                source: url::ParseError::RelativeUrlWithoutBase,
                ..
            }
        ));
        assert_eq!(
            error.to_string(),
            "invalid endpoint `not a url`: relative URL without a base",
        );
    }

    #[test]
    fn debug_redacts_api_key() {
        // Given
        let transport =
            HttpTransport::new("https://errors.example.com/api/v1/reports", SecureString::from("s3cr3t"))
                .unwrap();

        // When
        let rendered = format!("{:?}", transport);

        // Then
        assert!(!rendered.contains("s3cr3t"), "{}", rendered);
        assert!(rendered.contains("errors.example.com"));
    }

    #[test]
    fn unpooled_copy_targets_the_same_backend() {
        // Given
        let transport =
            HttpTransport::new("https://errors.example.com/api/v1/reports", SecureString::from("s3cr3t"))
                .unwrap();

        // When
        let unpooled = transport.unpooled().unwrap();

        // Then
        assert_eq!(unpooled.endpoint(), transport.endpoint());
        assert_eq!(unpooled.api_key.unsecure(), "s3cr3t");
        assert!(transport.detached().is_some());
    }
}
