use crate::{Filter, FilterError, Report, Verdict};
use std::collections::BTreeSet;

/// Discards reports whose kind is one of the given type names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreKinds {
    kinds: BTreeSet<String>,
}

impl IgnoreKinds {
    /// Creates a filter that drops the given kinds.
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
        }
    }
}

impl Filter for IgnoreKinds {
    fn name(&self) -> &str {
        "ignore-kinds"
    }

    fn apply(&self, report: &mut Report) -> Result<Verdict, FilterError> {
        if self.kinds.contains(report.kind()) {
            return Ok(Verdict::Discard);
        }

        Ok(Verdict::Keep)
    }
}
