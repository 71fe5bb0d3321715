#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Exponential backoff with jitter, used to space out delivery retries.
#[cfg(feature = "backoff")]
mod backoff {
    pub mod config;
    pub mod wrapper;
}
#[cfg(feature = "backoff")]
pub use self::backoff::{config::BackoffConfig, wrapper::Backoff};
