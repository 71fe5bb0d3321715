use herald_factory::Deserialize as HeraldDeserialize;
use tracing_core::LevelFilter;

/// Deserializable counterpart of [`LevelFilter`], ordered from least to most
/// verbose.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, HeraldDeserialize,
)]
#[herald(eq_fn = herald_deserialize::Slug::eq_as_slugs)]
pub enum Verbosity {
    /// Nothing.
    #[herald(alias = "none", alias = "silent")]
    Off,

    /// Errors only.
    #[herald(alias = "err")]
    Error,

    /// Warnings and errors.
    #[herald(alias = "warning")]
    Warn,

    /// Informational messages and above.
    #[default]
    Info,

    /// Debugging detail and above.
    Debug,

    /// Everything.
    #[herald(alias = "all")]
    Trace,
}

impl From<Verbosity> for LevelFilter {
    fn from(value: Verbosity) -> Self {
        match value {
            Verbosity::Off => LevelFilter::OFF,
            Verbosity::Error => LevelFilter::ERROR,
            Verbosity::Warn => LevelFilter::WARN,
            Verbosity::Info => LevelFilter::INFO,
            Verbosity::Debug => LevelFilter::DEBUG,
            Verbosity::Trace => LevelFilter::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_aliases() {
        for (input, expected) in [
            ("OFF", Verbosity::Off),
            ("silent", Verbosity::Off),
            ("err", Verbosity::Error),
            ("Warning", Verbosity::Warn),
            ("info", Verbosity::Info),
            ("all", Verbosity::Trace),
        ] {
            assert_eq!(serde_yml::from_str::<Verbosity>(input).unwrap(), expected);
        }
    }

    #[test]
    fn ordering_follows_verbosity() {
        assert!(Verbosity::Trace > Verbosity::Info);
        assert!(Verbosity::Off < Verbosity::Error);
        assert_eq!(LevelFilter::from(Verbosity::Warn), LevelFilter::WARN);
    }
}
