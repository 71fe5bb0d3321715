use config::ConfigError;
use thiserror::Error;

/// Failure to assemble or interpret the configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HeraldConfigError {
    /// The sources could not be read or merged, e.g. a file failed to parse.
    #[error("failed to assemble the configuration sources: {0}")]
    Assemble(#[source] ConfigError),

    /// The merged configuration does not fit the expected shape.
    #[error("invalid configuration: {0}")]
    Invalid(#[source] ConfigError),
}

impl HeraldConfigError {
    /// The underlying `config` error.
    pub fn config_error(&self) -> &ConfigError {
        match self {
            Self::Assemble(error) | Self::Invalid(error) => error,
        }
    }
}
