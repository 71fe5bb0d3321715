use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

/// Free-form string attributes attached to a report, kept in key order.
pub type Context = BTreeMap<String, String>;

/// Canonical record of one captured fault.
///
/// A report is built by the [`Normalizer`](crate::Normalizer), adjusted by
/// the [`FilterChain`](crate::FilterChain) through `&mut Report`, and from
/// then on only read by whoever delivers it.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    kind: String,
    message: String,
    backtrace: Vec<Frame>,
    context: Context,
    performance: Option<PerformanceTag>,
    tag: Option<String>,
    environment: Option<String>,
    timestamp: SystemTime,
}

/// One frame of a report's backtrace, innermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    /// Source file, or an empty string when unknown.
    pub file: String,
    /// Line number, when known.
    pub line: Option<u32>,
    /// Function or symbol name.
    pub function: String,
}

/// A timed operation that was in progress when the fault occurred, such as a
/// SQL statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceTag {
    /// What kind of operation this is (`"sql"`, `"http"`, …).
    pub name: String,
    /// The operation body, e.g. the statement text.
    pub body: String,
    /// How long the operation ran, when measured.
    pub duration: Option<Duration>,
}

impl Report {
    pub(crate) fn new(kind: String, message: String, backtrace: Vec<Frame>) -> Self {
        Self {
            kind,
            message,
            backtrace,
            context: Context::new(),
            performance: None,
            tag: None,
            environment: None,
            timestamp: SystemTime::now(),
        }
    }

    /// The fault type, e.g. `"std::io::Error"`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The human-readable fault message. May be empty.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Backtrace frames, possibly empty.
    pub fn backtrace(&self) -> &[Frame] {
        &self.backtrace
    }

    /// Context attributes.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The attached performance tag, if any.
    pub fn performance(&self) -> Option<&PerformanceTag> {
        self.performance.as_ref()
    }

    /// The event tag (`"sql"`, `"job"`, `"request"`, …), if any.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// The environment the report was captured in, if configured.
    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// Capture time.
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}

impl Report {
    /// Replaces the message.
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    /// Gives mutable access to the context attributes.
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Inserts or replaces one context attribute.
    pub fn insert_context(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.context.insert(key.into(), value.into());
    }

    /// Gives mutable access to the performance tag, if any.
    pub fn performance_mut(&mut self) -> Option<&mut PerformanceTag> {
        self.performance.as_mut()
    }

    /// Attaches or removes the performance tag.
    pub fn set_performance(&mut self, performance: Option<PerformanceTag>) {
        self.performance = performance;
    }

    /// Sets or clears the event tag.
    pub fn set_tag(&mut self, tag: Option<String>) {
        self.tag = tag;
    }

    pub(crate) fn set_environment(&mut self, environment: Option<String>) {
        self.environment = environment;
    }
}

impl PerformanceTag {
    /// Creates a new performance tag.
    pub fn new(name: impl Into<String>, body: impl Into<String>, duration: Option<Duration>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            duration,
        }
    }
}

impl Serialize for Report {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Report", 8)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("backtrace", &self.backtrace)?;
        state.serialize_field("context", &self.context)?;
        state.serialize_field("performance", &self.performance)?;
        state.serialize_field("tag", &self.tag)?;
        state.serialize_field("environment", &self.environment)?;
        state.serialize_field(
            "timestamp",
            &humantime::format_rfc3339_millis(self.timestamp).to_string(),
        )?;
        state.end()
    }
}

impl Serialize for PerformanceTag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("PerformanceTag", 3)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("body", &self.body)?;
        state.serialize_field(
            "duration_ms",
            &self
                .duration
                .map(|duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)),
        )?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn serializes_to_wire_shape() {
        // Given
        let mut report = Report::new(
            "std::io::Error".to_string(),
            "connection reset".to_string(),
            vec![Frame {
                file: "src/main.rs".to_string(),
                line: Some(7),
                function: "app::main".to_string(),
            }],
        );
        report.insert_context("user", "42");
        report.set_performance(Some(PerformanceTag::new(
            "sql",
            "SELECT 1",
            Some(Duration::from_millis(12)),
        )));
        report.set_tag(Some("sql".to_string()));
        report.timestamp = SystemTime::UNIX_EPOCH + Duration::from_millis(1_500);

        // When
        let actual = serde_json::to_value(&report).unwrap();

        // Then
        assert_eq!(
            actual,
            json!({
                "kind": "std::io::Error",
                "message": "connection reset",
                "backtrace": [{"file": "src/main.rs", "line": 7, "function": "app::main"}],
                "context": {"user": "42"},
                "performance": {"name": "sql", "body": "SELECT 1", "duration_ms": 12},
                "tag": "sql",
                "environment": null,
                "timestamp": "1970-01-01T00:00:01.500Z",
            }),
        );
    }

    #[test]
    fn huge_durations_saturate() {
        // Given
        let performance = PerformanceTag::new("sql", "SELECT 1", Some(Duration::MAX));

        // When
        let actual = serde_json::to_value(&performance).unwrap();

        // Then
        assert_eq!(actual["duration_ms"], json!(u64::MAX));
    }
}
