use crate::{ConfigFile, Pivot};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod file;

const CONFIG_DIR_VAR: &str = "HERALD_CONFIG_DIR";

/// Finds the config files that apply to an environment.
pub struct Scanner;

impl Scanner {
    /// Lists the config files directly inside `dir` that apply to
    /// `environment`, **ordered for precedence**: later files override
    /// earlier ones.
    ///
    /// Generic files (`{name}.{ext}`) precede environment-specific files
    /// (`{name}.{environment}.{ext}`); within each group the order is
    /// lexicographic by path. Nested directories and unreadable entries are
    /// skipped. A missing directory yields no files.
    pub fn find_config_files(dir: &Path, environment: &str) -> Vec<ConfigFile> {
        let mut files = std::fs::read_dir(dir)
            .into_iter()
            .flat_map(|read_dir| read_dir.filter_map(Result::ok))
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter_map(ConfigFile::try_at)
            .filter(|file| file.applies_to(environment))
            .collect::<Vec<_>>();

        files.sort();

        debug!(
            dir = %dir.display(),
            environment,
            files = files.len(),
            "Scanned config directory",
        );

        files
    }

    /// Resolves the config directory: `HERALD_CONFIG_DIR` if set, else the
    /// given `dir_name` if non-blank, else `config`. Relative paths are
    /// resolved against the [pivot directory](Pivot).
    pub fn resolve_config_dir(dir_name: Option<&str>) -> PathBuf {
        let path = env::var(CONFIG_DIR_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                dir_name
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(|| PathBuf::from("config"));

        if path.is_absolute() {
            path
        } else {
            Pivot::resolve().join(path)
        }
    }
}
