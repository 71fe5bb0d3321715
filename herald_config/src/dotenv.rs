use crate::Pivot;
use std::path::Path;
use std::sync::Once;
use tracing::debug;

const FILE_DOT_ENV_LOCAL: &str = ".env.local";
const FILE_DOT_ENV_GLOBAL: &str = ".env";

/// Loads variables from the `.env.local` and `.env` files of the
/// [pivot directory](Pivot).
pub struct DotEnv;

impl DotEnv {
    /// Loads the dot-env files at most once per process.
    pub fn tap() {
        static INIT: Once = Once::new();

        INIT.call_once(Self::load);
    }

    /// Loads the dot-env files of the pivot directory. Variables already set
    /// are kept; `.env.local` takes precedence over `.env`. Missing files are
    /// ignored.
    pub fn load() {
        Self::load_from(&Pivot::resolve());
    }

    /// Same as [`load`](DotEnv::load), from the given directory.
    pub fn load_from(dir: &Path) {
        for name in [FILE_DOT_ENV_LOCAL, FILE_DOT_ENV_GLOBAL] {
            let path = dir.join(name);

            if dotenvy::from_path(&path).is_ok() {
                debug!(path = %path.display(), "Loaded dot-env file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scopeguard::defer;
    use std::env::{remove_var, var};
    use std::fs;

    const BOTH_FILES: &str = "HERALD_TEST_DOTENV_BOTH_FILES";
    const LOCAL_ONLY: &str = "HERALD_TEST_DOTENV_LOCAL_ONLY";
    const GLOBAL_ONLY: &str = "HERALD_TEST_DOTENV_GLOBAL_ONLY";
    const PRESET: &str = "HERALD_TEST_DOTENV_PRESET";

    #[test]
    fn local_file_wins_and_environment_is_kept() {
        // Given
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(FILE_DOT_ENV_LOCAL),
            format!("{}=loc\n{}=loc\n{}=loc\n", BOTH_FILES, LOCAL_ONLY, PRESET),
        )
        .unwrap();
        fs::write(
            dir.path().join(FILE_DOT_ENV_GLOBAL),
            format!("{}=glo\n{}=glo\n{}=glo\n", BOTH_FILES, GLOBAL_ONLY, PRESET),
        )
        .unwrap();
        unsafe {
            std::env::set_var(PRESET, "env");
        }
        defer! {
            unsafe {
                for name in [BOTH_FILES, LOCAL_ONLY, GLOBAL_ONLY, PRESET] {
                    remove_var(name);
                }
            }
        }

        // When
        DotEnv::load_from(dir.path());

        // Then
        assert_eq!(var(BOTH_FILES).unwrap(), "loc");
        assert_eq!(var(LOCAL_ONLY).unwrap(), "loc");
        assert_eq!(var(GLOBAL_ONLY).unwrap(), "glo");
        assert_eq!(var(PRESET).unwrap(), "env");
    }

    #[test]
    fn missing_files_are_ignored() {
        // Given
        let dir = tempfile::tempdir().unwrap();

        // When
        DotEnv::load_from(dir.path());
    }
}
