#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Implements the notifier facades.
mod facade {
    /// Implements the configuration sections.
    pub mod config {
        /// Implements the [`HeraldConfig`](crate::HeraldConfig) root.
        pub mod root;

        /// Implements the [`NotifierConfig`](crate::NotifierConfig) section.
        pub mod notifier;

        /// Implements the declarative [`FilterSpec`](crate::FilterSpec).
        pub mod filter;

        /// Implements the [`HeraldConfigError`](crate::HeraldConfigError).
        pub mod error;
    }

    /// Implements the [`Notifier`](crate::Notifier) facade.
    pub mod notifier;
}

/// Re-exports the configuration types.
pub use self::facade::config::error::HeraldConfigError;
pub use self::facade::config::filter::{FilterKind, FilterSpec};
pub use self::facade::config::notifier::NotifierConfig;
pub use self::facade::config::root::HeraldConfig;

/// Re-exports the [`Notifier`] facade.
pub use self::facade::notifier::builder::NotifierBuilder;
pub use self::facade::notifier::event::Event;
pub use self::facade::notifier::stats::NotifierStats;
pub use self::facade::notifier::{Notifier, NotifierError, Skipped, Submission};

/// Framework-agnostic adapters feeding the [`Notifier`] through
/// [`Notifier::ingest`].
pub mod integration {
    /// Declared optional capabilities.
    mod capabilities;
    pub use self::capabilities::Capabilities;

    /// Reporting of failed SQL statements, with dialect-aware redaction.
    pub mod sql;

    /// Reporting of failed background jobs.
    pub mod jobs;

    /// Request context for failures inside request handlers.
    pub mod requests;

    /// Panic hook reporting panics before the process goes down.
    pub mod panic;
}

/// Bridges `tracing` events into reports.
#[cfg(feature = "tracing")]
mod alert;
#[cfg(feature = "tracing")]
pub use self::alert::{ALERT_FIELD_NAME, AlertLayer, LOG_TAG, init_tracing};

#[cfg(test)]
mod testing;

/// Re-exports the public API of `herald-core` in the root of this crate for
/// convenience.
pub use herald_core::*;

/// Re-exports the delivery types in the root of this crate for convenience.
pub use herald_delivery::{
    DeliveryResult, DrainSummary, HttpTransport, OverflowPolicy, PermanentCause, TransientCause,
    Transport, TransportError,
};

/// Re-exports the public API of `herald-config` for convenience.
pub use herald_config as config_files;

/// Re-exports the backoff configuration.
pub use herald_util::BackoffConfig;

/// Re-exports the public API of `herald-tracing` for convenience.
#[cfg(feature = "tracing")]
pub use herald_tracing as tracing_setup;
