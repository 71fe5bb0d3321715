#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Canonical report record and its parts.
mod report;
pub use self::report::{Context, Frame, PerformanceTag, Report};

/// Parsing of textual backtraces into frames.
mod backtrace;

/// Abstraction over captured faults.
mod fault;
pub use self::fault::{ErrorFault, Fault, RawFault};

/// Conversion of faults into reports.
mod normalizer;
pub use self::normalizer::{MalformedInputError, Normalizer};

/// Prioritized, fail-open filter chain.
mod chain;
pub use self::chain::{Filter, FilterChain, FilterError, FilterOutcome, Verdict};

/// Ready-made filters.
pub mod filters {
    mod fn_filter;
    pub use self::fn_filter::FnFilter;

    mod ignore_kinds;
    pub use self::ignore_kinds::IgnoreKinds;

    mod keys_blocklist;
    pub use self::keys_blocklist::KeysBlocklist;

    mod redaction;
    pub use self::redaction::PatternRedaction;
}
