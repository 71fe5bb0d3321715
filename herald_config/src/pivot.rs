use std::env;
use std::path::PathBuf;

/// Owns the logic for [resolving](Pivot::resolve) the pivot directory.
///
/// The pivot directory is the directory containing `Cargo.toml` when running
/// under Cargo (`cargo run`, `cargo test`), and the current working directory
/// otherwise.
pub struct Pivot;

impl Pivot {
    /// Resolves the pivot directory. Falls back to `.` if the working directory
    /// is not accessible.
    pub fn resolve() -> PathBuf {
        env::var("CARGO_MANIFEST_DIR")
            .map(PathBuf::from)
            .or_else(|_| env::current_dir())
            .unwrap_or_else(|_| PathBuf::from("."))
    }
}
