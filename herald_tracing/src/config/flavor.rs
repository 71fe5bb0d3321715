use herald_factory::Deserialize as HeraldDeserialize;

/// Output layout of log lines, mapped onto the event formats of
/// `tracing_subscriber::fmt`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, HeraldDeserialize)]
#[herald(eq_fn = herald_deserialize::Slug::eq_as_slugs)]
pub enum FormatFlavor {
    /// Single line with all fields and span context.
    #[default]
    #[herald(alias = "default")]
    Full,

    /// Shorter single line.
    #[herald(alias = "short")]
    Compact,

    /// Multi-line, human-oriented.
    #[herald(alias = "multiline")]
    Pretty,

    /// One JSON object per line.
    #[cfg(feature = "json")]
    Json,
}
