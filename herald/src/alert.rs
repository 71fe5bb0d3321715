use crate::{Event as HeraldEvent, Notifier};
use herald_core::RawFault;
use herald_tracing::{NOTIFIER_TARGETS, Registry, SubscriberExt, SubscriberInitExt, TracingConfig};
use std::error::Error;
use std::fmt::Debug;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::TryInitError;

/// Name of the field that turns a log event into a report.
pub const ALERT_FIELD_NAME: &str = "alert";

/// Tag of reports raised from log events.
pub const LOG_TAG: &str = "log";

/// A [`Layer`] that reports every log event carrying a field named
/// [`ALERT_FIELD_NAME`], unless that field is `false`.
///
/// The report's type is the event's target, its message is the event's
/// message, and every other field becomes context. Events emitted by the
/// notifier itself are never reported.
///
/// ```no_run
/// # async fn example(notifier: herald::Notifier) {
/// use herald::tracing_setup::{Registry, SubscriberExt, SubscriberInitExt};
///
/// Registry::default()
///     .with(herald::AlertLayer::new(notifier))
///     .init();
///
/// tracing::error!(alert = true, order_id = 42, "Payment provider refused the charge");
/// # }
/// ```
pub struct AlertLayer {
    notifier: Notifier,
}

impl AlertLayer {
    /// Creates a layer reporting through the given notifier.
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }
}

impl<S> Layer<S> for AlertLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let target = event.metadata().target();
        if is_own_target(target) {
            return;
        }

        let mut visitor = AlertVisitor::default();
        event.record(&mut visitor);

        if !visitor.alert {
            return;
        }

        let fault = RawFault::new(target, visitor.message.unwrap_or_default());
        let herald_event = HeraldEvent::new(&fault)
            .with_tag(LOG_TAG)
            .with_context(visitor.fields.into_iter().collect())
            .with_context_entry("log.level", event.metadata().level().as_str());

        self.notifier.ingest(herald_event);
    }
}

/// Installs the global subscriber: the formatting layer configured by
/// `config`, plus an [`AlertLayer`] if a notifier is given.
pub fn init_tracing(
    config: &TracingConfig,
    notifier: Option<Notifier>,
) -> Result<(), TryInitError> {
    Registry::default()
        .with(herald_tracing::make_layer(config))
        .with(notifier.map(AlertLayer::new))
        .try_init()
}

fn is_own_target(target: &str) -> bool {
    NOTIFIER_TARGETS.iter().any(|own| {
        target
            .strip_prefix(own)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}

/// Walks an event's fields, looking for the alert marker and collecting the
/// rest.
#[derive(Default)]
struct AlertVisitor {
    alert: bool,
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl AlertVisitor {
    fn keep(&mut self, field: &Field, value: String) {
        match field.name() {
            ALERT_FIELD_NAME => self.alert = !value.eq_ignore_ascii_case("false"),
            "message" => self.message = Some(value),
            name => self.fields.push((name.to_string(), value)),
        }
    }
}

impl Visit for AlertVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.keep(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.keep(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.keep(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.keep(field, value.to_string());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.keep(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        self.keep(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        self.keep(field, format!("{:?}", value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NotifierConfig;
    use crate::testing::Recording;
    use pretty_assertions::assert_eq;

    #[test]
    fn own_targets() {
        assert!(is_own_target("herald"));
        assert!(is_own_target("herald_delivery::sender"));
        assert!(!is_own_target("heraldry"));
        assert!(!is_own_target("my_app::herald"));
    }

    #[tokio::test]
    async fn alert_events_are_reported() {
        // Given
        let transport = Recording::new();
        let notifier = Notifier::builder(NotifierConfig::default().with_environment("test"))
            .transport(transport.clone())
            .build()
            .unwrap();
        let subscriber = Registry::default().with(AlertLayer::new(notifier.clone()));

        // When
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(target: "billing", alert = true, order_id = 42, "Charge refused");
            tracing::error!(target: "billing", order_id = 43, "Not an alert");
            tracing::error!(target: "billing", alert = false, order_id = 44, "Alert turned off");
        });
        notifier.close().await;

        // Then
        let reports = transport.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind(), "billing");
        assert_eq!(reports[0].message(), "Charge refused");
        assert_eq!(reports[0].tag(), Some(LOG_TAG));
        assert_eq!(reports[0].context()["order_id"], "42");
        assert_eq!(reports[0].context()["log.level"], "ERROR");
    }
}
