use crate::Report;
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::panic::{AssertUnwindSafe, catch_unwind};
use thiserror::Error;
use tracing::{error, warn};

/// A named step of the [`FilterChain`] that may enrich, redact or discard a
/// report.
pub trait Filter: Send + Sync {
    /// Name used in logs and in [`FilterOutcome::Discarded`].
    fn name(&self) -> &str;

    /// Inspects and possibly mutates the report.
    ///
    /// Returning an error (or panicking) causes every change made by this call
    /// to be rolled back, and the chain continues with the next filter.
    fn apply(&self, report: &mut Report) -> Result<Verdict, FilterError>;
}

/// What a [`Filter`] decided about a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep the report (with whatever changes were made) and continue.
    Keep,
    /// Drop the report. Remaining filters are skipped.
    Discard,
}

/// A filter failed to process a report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct FilterError {
    message: String,
}

impl FilterError {
    /// Creates a new filter error with the given description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of running a report through a [`FilterChain`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    /// Every filter kept the report.
    Passed(Report),
    /// The named filter discarded the report.
    Discarded {
        /// Name of the discarding filter.
        filter: String,
    },
}

/// Ordered set of [`Filter`]s.
///
/// Filters run in ascending priority; filters of equal priority run in the
/// order they were added. The chain is assembled during initialization and
/// shared immutably afterwards.
#[derive(Default)]
pub struct FilterChain {
    entries: Vec<Entry>,
}

struct Entry {
    priority: i32,
    filter: Box<dyn Filter>,
}

impl FilterChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter with the given priority. Lower priorities run first.
    pub fn add_filter(&mut self, filter: impl Filter + 'static, priority: i32) -> &mut Self {
        self.add_boxed_filter(Box::new(filter), priority)
    }

    /// Adds an already boxed filter with the given priority.
    pub fn add_boxed_filter(&mut self, filter: Box<dyn Filter>, priority: i32) -> &mut Self {
        let position = self
            .entries
            .partition_point(|entry| entry.priority <= priority);
        self.entries.insert(position, Entry { priority, filter });

        self
    }

    /// Number of registered filters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether no filters are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the registered filters, in execution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.filter.name())
    }

    /// Runs the report through every filter in order.
    ///
    /// Each filter works on a copy of the current report, which replaces the
    /// current report only if the filter returns [`Verdict::Keep`]. A filter
    /// that errors or panics is logged and skipped.
    pub fn run(&self, mut report: Report) -> FilterOutcome {
        for entry in &self.entries {
            let name = entry.filter.name();
            let mut candidate = report.clone();

            let result = catch_unwind(AssertUnwindSafe(|| entry.filter.apply(&mut candidate)));

            match result {
                Ok(Ok(Verdict::Keep)) => report = candidate,
                Ok(Ok(Verdict::Discard)) => {
                    return FilterOutcome::Discarded {
                        filter: name.to_string(),
                    };
                }
                Ok(Err(filter_error)) => {
                    warn!(
                        filter = name,
                        report_kind = report.kind(),
                        error = %filter_error,
                        "Filter failed; skipping it",
                    );
                }
                Err(payload) => {
                    error!(
                        filter = name,
                        report_kind = report.kind(),
                        panic = panic_message(payload.as_ref()),
                        "Filter panicked; skipping it",
                    );
                }
            }
        }

        FilterOutcome::Passed(report)
    }
}

impl Debug for FilterChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|entry| (entry.priority, entry.filter.name())),
            )
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return message;
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message;
    }
    "<non-string panic payload>"
}
