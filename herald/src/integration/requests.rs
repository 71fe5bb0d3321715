use crate::{Event, Notifier, Submission};
use herald_core::{Context, Fault};

/// Tag of reports about failed requests.
pub const REQUEST_TAG: &str = "request";

/// What a request handler knows about the request that failed.
///
/// Headers and parameters end up in the report context under
/// `request.header.<name>` and `request.param.<name>`; with the
/// [`requests`](crate::integration::Capabilities::requests) capability
/// declared, the ones carrying credentials are filtered out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    method: String,
    path: String,
    route: Option<String>,
    extra: Context,
}

impl RequestContext {
    /// Describes a request by method and path.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            route: None,
            extra: Context::new(),
        }
    }

    /// Adds the matched route pattern, e.g. `/users/{id}`.
    pub fn with_route(self, route: impl Into<String>) -> Self {
        Self {
            route: Some(route.into()),
            ..self
        }
    }

    /// Adds a header. Names are lowercased.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        let key = format!("request.header.{}", name.as_ref().to_ascii_lowercase());
        self.extra.insert(key, value.into());

        self
    }

    /// Adds a query or form parameter.
    pub fn with_param(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        let key = format!("request.param.{}", name.as_ref());
        self.extra.insert(key, value.into());

        self
    }

    /// The request as report context.
    pub fn to_context(&self) -> Context {
        let mut context = self.extra.clone();
        context.insert("request.method".to_string(), self.method.clone());
        context.insert("request.path".to_string(), self.path.clone());

        if let Some(route) = self.route.as_ref() {
            context.insert("request.route".to_string(), route.clone());
        }

        context
    }

    /// Reports the fault with this request as context. Nothing is reported
    /// unless the notifier declared the `requests` capability.
    pub fn report(&self, notifier: &Notifier, fault: &dyn Fault) -> Option<Submission> {
        if !notifier.capabilities().requests() {
            tracing::debug!(
                method = self.method.as_str(),
                path = self.path.as_str(),
                "Requests capability not declared; request failure not reported",
            );
            return None;
        }

        let event = Event::new(fault)
            .with_tag(REQUEST_TAG)
            .with_context(self.to_context());

        Some(notifier.ingest(event))
    }
}
