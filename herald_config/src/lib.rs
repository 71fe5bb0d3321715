#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Resolves the directory relative to which config and dot-env files are
/// looked up.
mod pivot;
pub use self::pivot::Pivot;

/// Resolves the active environment name.
mod environment;
pub use self::environment::{ActiveEnvironment, DEFAULT_ENVIRONMENT};

/// Finds config files in the filesystem.
mod scanner;
pub use self::scanner::Scanner;
pub use self::scanner::file::ConfigFile;

/// Assembles the layered [`ConfigBuilder`](config::ConfigBuilder).
mod assembler;
pub use self::assembler::{Assembler, AssemblerChoices};

/// Loads `.env` files into the process environment.
mod dotenv;
pub use self::dotenv::DotEnv;
