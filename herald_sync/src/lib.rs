#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// One-shot release signal with any number of observers.
mod latch;
pub use self::latch::{Gate, Latch};
