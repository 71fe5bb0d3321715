use crate::{Context, Fault, Report};
use thiserror::Error;

/// Turns captured [`Fault`]s into [`Report`]s, stamping them with the
/// configured environment name.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    environment: Option<String>,
}

/// The fault could not describe itself well enough to be reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedInputError {
    /// The fault has no type name, or only a blank one.
    #[error("fault has no type name")]
    MissingKind,

    /// The fault has a type but no message.
    #[error("fault of type `{kind}` has no message")]
    MissingMessage {
        /// The fault's type name.
        kind: String,
    },
}

impl Normalizer {
    /// Creates a normalizer that stamps reports with the given environment.
    pub fn new(environment: Option<String>) -> Self {
        Self { environment }
    }

    /// The environment stamped on every report.
    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// Builds a report out of the given fault and caller context.
    ///
    /// The fault's own context is merged underneath the caller's: on a key
    /// collision the caller wins. A fault without a backtrace yields a report
    /// with no frames.
    pub fn normalize(
        &self,
        fault: &dyn Fault,
        context: Context,
    ) -> Result<Report, MalformedInputError> {
        let kind = match fault.kind() {
            Some(kind) if !kind.trim().is_empty() => kind.into_owned(),
            _ => return Err(MalformedInputError::MissingKind),
        };

        let Some(message) = fault.message() else {
            return Err(MalformedInputError::MissingMessage { kind });
        };
        let message = message.into_owned();

        let mut report = Report::new(kind, message, fault.backtrace());

        let mut merged = fault.context();
        merged.extend(context);
        *report.context_mut() = merged;
        report.set_environment(self.environment.clone());

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorFault, Frame, RawFault};
    use pretty_assertions::assert_eq;

    #[test]
    fn normalizes_raw_fault() {
        // Given
        let normalizer = Normalizer::new(Some("production".to_string()));
        let fault = RawFault::new("Timeout", "upstream took too long")
            .with_backtrace(vec![Frame::new("src/lib.rs", Some(3), "app::call")]);
        let context = Context::from([("route".to_string(), "/orders".to_string())]);

        // When
        let report = normalizer.normalize(&fault, context).unwrap();

        // Then
        assert_eq!(report.kind(), "Timeout");
        assert_eq!(report.message(), "upstream took too long");
        assert_eq!(report.backtrace(), [Frame::new("src/lib.rs", Some(3), "app::call")]);
        assert_eq!(report.context().get("route").map(String::as_str), Some("/orders"));
        assert_eq!(report.environment(), Some("production"));
        assert_eq!(report.performance(), None);
        assert_eq!(report.tag(), None);
    }

    #[test]
    fn missing_backtrace_is_empty() {
        // When
        let report = Normalizer::default()
            .normalize(&RawFault::new("Boom", ""), Context::new())
            .unwrap();

        // Then
        assert!(report.backtrace().is_empty());
        assert_eq!(report.message(), "");
    }

    #[test]
    fn blank_kind_is_malformed() {
        // Given
        let normalizer = Normalizer::default();

        // Then
        assert_eq!(
            normalizer.normalize(&RawFault::new("  ", "message"), Context::new()),
            Err(MalformedInputError::MissingKind),
        );
        assert_eq!(
            normalizer.normalize(&RawFault::default(), Context::new()),
            Err(MalformedInputError::MissingKind),
        );
    }

    #[test]
    fn absent_message_is_malformed() {
        // When
        let actual =
            Normalizer::default().normalize(&RawFault::without_message("Boom"), Context::new());

        // Then
        assert_eq!(
            actual,
            Err(MalformedInputError::MissingMessage {
                kind: "Boom".to_string()
            }),
        );
    }

    #[test]
    fn caller_context_wins_over_fault_context() {
        // Given
        let error = std::fmt::Error;
        let context = Context::from([("cause.1".to_string(), "overridden".to_string())]);

        // When
        let report = Normalizer::default()
            .normalize(&ErrorFault::new(&error), context)
            .unwrap();

        // Then
        assert!(report.kind().ends_with("Error"));
        assert_eq!(report.message(), "an error occurred when formatting an argument");
        assert_eq!(
            report.context().get("cause.1").map(String::as_str),
            Some("overridden"),
        );
    }
}
