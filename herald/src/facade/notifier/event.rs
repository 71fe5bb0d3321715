use herald_core::{Context, Fault, PerformanceTag};

/// One fault on its way into a [`Notifier`](crate::Notifier), together with
/// what the caller knows about it.
///
/// The tag and performance attachment are set on the report before any filter
/// runs, so that filters keyed on them (such as SQL redaction) see them.
pub struct Event<'a> {
    pub(crate) fault: &'a dyn Fault,
    pub(crate) context: Context,
    pub(crate) tag: Option<String>,
    pub(crate) performance: Option<PerformanceTag>,
}

impl<'a> Event<'a> {
    /// Wraps the fault, without context.
    pub fn new(fault: &'a dyn Fault) -> Self {
        Self {
            fault,
            context: Context::new(),
            tag: None,
            performance: None,
        }
    }

    /// Replaces the context.
    pub fn with_context(self, context: Context) -> Self {
        Self { context, ..self }
    }

    /// Adds one context entry.
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());

        self
    }

    /// Names the source of the fault, e.g. `"sql"` or `"job"`.
    pub fn with_tag(self, tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..self
        }
    }

    /// Attaches the operation that was running when the fault occurred.
    pub fn with_performance(self, performance: PerformanceTag) -> Self {
        Self {
            performance: Some(performance),
            ..self
        }
    }
}
