use std::env;
use std::sync::OnceLock;

/// The environment assumed when `HERALD_ENV` is not set.
pub const DEFAULT_ENVIRONMENT: &str = "development";

const ENVIRONMENT_VAR: &str = "HERALD_ENV";

/// The name of the deployment environment the process runs in
/// (`production`, `staging`, …).
///
/// It selects the environment-specific config files and is the default
/// environment stamped on reports.
pub struct ActiveEnvironment;

impl ActiveEnvironment {
    /// Returns the active environment name, read once from `HERALD_ENV` and
    /// lowercased. Blank or unset values give [`DEFAULT_ENVIRONMENT`].
    pub fn name() -> &'static str {
        static ACTIVE: OnceLock<String> = OnceLock::new();

        ACTIVE.get_or_init(|| Self::discern(env::var(ENVIRONMENT_VAR).ok().as_deref()))
    }

    fn discern(value: Option<&str>) -> String {
        value
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_ENVIRONMENT)
            .to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn discern() {
        assert_eq!(ActiveEnvironment::discern(None), "development");
        assert_eq!(ActiveEnvironment::discern(Some("  ")), "development");
        assert_eq!(ActiveEnvironment::discern(Some(" Production")), "production");
    }
}
