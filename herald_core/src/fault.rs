use crate::{Context, Frame};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::borrow::Cow;
use std::error::Error;

/// Anything that can be reported: a captured fault that knows its type, its
/// message and, optionally, where it happened.
///
/// Returning `None` from [`kind`](Fault::kind) or [`message`](Fault::message)
/// means the fault cannot describe itself, and normalizing it fails. An empty
/// message is a valid message.
pub trait Fault {
    /// The fault's type name.
    fn kind(&self) -> Option<Cow<'_, str>>;

    /// The fault's message.
    fn message(&self) -> Option<Cow<'_, str>>;

    /// Backtrace frames, innermost first.
    fn backtrace(&self) -> Vec<Frame> {
        Vec::new()
    }

    /// Attributes the fault carries about itself. Caller-supplied context takes
    /// precedence over these.
    fn context(&self) -> Context {
        Context::new()
    }
}

/// A fault given as plain values, e.g. by an adapter that received it from
/// outside the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFault {
    kind: Option<String>,
    message: Option<String>,
    backtrace: Vec<Frame>,
}

impl RawFault {
    /// Creates a fault with the given type and message.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            message: Some(message.into()),
            backtrace: Vec::new(),
        }
    }

    /// Creates a fault with a type but no message at all.
    pub fn without_message(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            message: None,
            backtrace: Vec::new(),
        }
    }

    /// Attaches backtrace frames.
    pub fn with_backtrace(self, backtrace: Vec<Frame>) -> Self {
        Self { backtrace, ..self }
    }

    /// Attaches a backtrace given in the standard textual rendering.
    pub fn with_backtrace_text(self, text: &str) -> Self {
        self.with_backtrace(Frame::parse_backtrace(text))
    }
}

impl Fault for RawFault {
    fn kind(&self) -> Option<Cow<'_, str>> {
        self.kind.as_deref().map(Cow::Borrowed)
    }

    fn message(&self) -> Option<Cow<'_, str>> {
        self.message.as_deref().map(Cow::Borrowed)
    }

    fn backtrace(&self) -> Vec<Frame> {
        self.backtrace.clone()
    }
}

/// Adapts any [`std::error::Error`] into a [`Fault`].
///
/// The kind is the concrete type name, the message is the error's `Display`
/// output, and every error in the `source()` chain is recorded as context
/// under `cause.1`, `cause.2`, and so on.
pub struct ErrorFault<'a> {
    kind: &'static str,
    error: &'a (dyn Error + 'static),
    backtrace: Vec<Frame>,
}

impl<'a> ErrorFault<'a> {
    /// Wraps the given error without a backtrace.
    pub fn new<E>(error: &'a E) -> Self
    where
        E: Error + 'static,
    {
        Self {
            kind: std::any::type_name::<E>(),
            error,
            backtrace: Vec::new(),
        }
    }

    /// Wraps a type-erased error. The kind is taken from the caller, since the
    /// concrete type is no longer known.
    pub fn from_dyn(kind: &'static str, error: &'a (dyn Error + 'static)) -> Self {
        Self {
            kind,
            error,
            backtrace: Vec::new(),
        }
    }

    /// Attaches the frames of the given backtrace, if it was captured.
    pub fn with_backtrace(self, backtrace: &Backtrace) -> Self {
        let backtrace = match backtrace.status() {
            BacktraceStatus::Captured => Frame::parse_backtrace(&backtrace.to_string()),
            _ => Vec::new(),
        };

        Self { backtrace, ..self }
    }

    /// Captures the current backtrace (subject to `RUST_BACKTRACE`) and
    /// attaches it.
    pub fn with_captured_backtrace(self) -> Self {
        let backtrace = Backtrace::capture();

        self.with_backtrace(&backtrace)
    }
}

impl Fault for ErrorFault<'_> {
    fn kind(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.kind))
    }

    fn message(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Owned(self.error.to_string()))
    }

    fn backtrace(&self) -> Vec<Frame> {
        self.backtrace.clone()
    }

    fn context(&self) -> Context {
        let mut context = Context::new();
        let mut source = self.error.source();
        let mut depth = 1;

        while let Some(cause) = source {
            context.insert(format!("cause.{}", depth), cause.to_string());
            source = cause.source();
            depth += 1;
        }

        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fmt::{Display, Formatter};

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl Display for Outer {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str("failed to load settings")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn error_fault_describes_error() {
        // Given
        let error = Outer(std::io::Error::other("disk on fire"));

        // When
        let fault = ErrorFault::new(&error);

        // Then
        assert!(fault.kind().unwrap().ends_with("Outer"));
        assert_eq!(fault.message().unwrap(), "failed to load settings");
        assert_eq!(
            fault.context(),
            Context::from([("cause.1".to_string(), "disk on fire".to_string())]),
        );
        assert!(fault.backtrace().is_empty());
    }

    #[test]
    fn raw_fault_without_message() {
        // Given
        let fault = RawFault::without_message("Timeout");

        // Then
        assert_eq!(fault.kind().as_deref(), Some("Timeout"));
        assert_eq!(fault.message(), None);
    }
}
