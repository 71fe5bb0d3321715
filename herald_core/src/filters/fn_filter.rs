use crate::{Filter, FilterError, Report, Verdict};
use std::fmt::{Debug, Formatter};

type FilterFn = dyn Fn(&mut Report) -> Result<Verdict, FilterError> + Send + Sync;

/// A [`Filter`] made of a name and a closure.
///
/// ```
/// use herald_core::filters::FnFilter;
/// use herald_core::{FilterChain, Report, Verdict};
///
/// let mut chain = FilterChain::new();
/// chain.add_filter(
///     FnFilter::new("add-host", |report: &mut Report| {
///         report.insert_context("host", "web-1");
///         Ok(Verdict::Keep)
///     }),
///     0,
/// );
/// ```
pub struct FnFilter {
    name: String,
    function: Box<FilterFn>,
}

impl FnFilter {
    /// Wraps the given closure.
    pub fn new<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&mut Report) -> Result<Verdict, FilterError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            function: Box::new(function),
        }
    }
}

impl Filter for FnFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, report: &mut Report) -> Result<Verdict, FilterError> {
        (self.function)(report)
    }
}

impl Debug for FnFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFilter").field("name", &self.name).finish()
    }
}
