use crate::{Event, Notifier, Submission};
use herald_core::filters::PatternRedaction;
use herald_core::{Fault, PerformanceTag};
use regex::Regex;
use std::time::Duration;

/// Tag and performance-tag name of reports about failed SQL statements.
pub const SQL_TAG: &str = "sql";

/// Body substituted for a statement whose redaction left unbalanced quotes or
/// comments behind.
pub const UNFILTERED_NOTICE: &str = "Error: herald was unable to filter the query";

const REPLACEMENT: &str = "?";

/// The SQL flavor spoken by the application's database, which decides how
/// literals are recognized in statements attached to reports.
#[derive(herald_factory::Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[herald(eq_fn = herald_deserialize::Slug::eq_as_slugs)]
pub enum SqlDialect {
    /// PostgreSQL.
    #[herald(alias = "postgresql", alias = "pg", alias = "postgis")]
    Postgres,

    /// MySQL and MariaDB.
    #[herald(alias = "mysql2", alias = "mariadb", alias = "trilogy")]
    Mysql,

    /// SQLite.
    #[herald(alias = "sqlite3")]
    Sqlite,

    /// Anything else: the literal forms common to most dialects.
    #[default]
    #[herald(alias = "ansi", alias = "other")]
    Generic,
}

const SINGLE_QUOTES: &str = r"'(?:[^'\\]|''|\\.)*'";
const DOUBLE_QUOTES: &str = r#""(?:[^"\\]|""|\\.)*""#;
const DOLLAR_QUOTES: &str = r"(?s)\$[A-Za-z_]*\$.*?\$[A-Za-z_]*\$";
const LINE_COMMENTS: &str = r"--[^\r\n]*";
const HASH_COMMENTS: &str = r"#[^\r\n]*";
const BLOCK_COMMENTS: &str = r"(?s)/\*.*?\*/";
const UUIDS: &str = r"(?i)\{?\b[0-9a-f]{8}-?[0-9a-f]{4}-?[0-9a-f]{4}-?[0-9a-f]{4}-?[0-9a-f]{12}\b\}?";
const HEX_LITERALS: &str = r"\b0[xX][0-9a-fA-F]+\b";
const NUMERIC_LITERALS: &str = r"-?\b\d+(?:\.\d+)?(?:[eE][-+]?\d+)?\b";
const BOOLEAN_LITERALS: &str = r"(?i)\b(?:true|false|null)\b";

impl SqlDialect {
    /// Picks the dialect from a database adapter or driver name, such as
    /// `postgresql`, `mysql2` or `sqlite3`. Unknown names give
    /// [`Generic`](SqlDialect::Generic).
    pub fn from_adapter(adapter: &str) -> Self {
        let adapter = adapter.to_ascii_lowercase();

        if adapter.contains("postg") || adapter == "pg" {
            Self::Postgres
        } else if adapter.contains("mysql") || adapter.contains("maria") || adapter == "trilogy" {
            Self::Mysql
        } else if adapter.contains("sqlite") {
            Self::Sqlite
        } else {
            Self::Generic
        }
    }

    /// Patterns matching the literals of this dialect, in the order they are
    /// applied. Comments and quoted strings come first so that their contents
    /// are replaced as a whole.
    fn patterns(self) -> &'static [&'static str] {
        match self {
            Self::Postgres => &[
                DOLLAR_QUOTES,
                LINE_COMMENTS,
                BLOCK_COMMENTS,
                SINGLE_QUOTES,
                UUIDS,
                HEX_LITERALS,
                NUMERIC_LITERALS,
                BOOLEAN_LITERALS,
            ],
            Self::Mysql => &[
                LINE_COMMENTS,
                HASH_COMMENTS,
                BLOCK_COMMENTS,
                SINGLE_QUOTES,
                DOUBLE_QUOTES,
                UUIDS,
                HEX_LITERALS,
                NUMERIC_LITERALS,
                BOOLEAN_LITERALS,
            ],
            Self::Sqlite | Self::Generic => &[
                LINE_COMMENTS,
                BLOCK_COMMENTS,
                SINGLE_QUOTES,
                UUIDS,
                HEX_LITERALS,
                NUMERIC_LITERALS,
                BOOLEAN_LITERALS,
            ],
        }
    }

    /// What must not survive redaction: a stray quote or comment delimiter
    /// means a literal was not recognized.
    fn leftover_guard(self) -> &'static str {
        match self {
            Self::Postgres => r"'|/\*|\*/|\$(?:[^?]|$)",
            Self::Mysql => r#"'|"|/\*|\*/"#,
            Self::Sqlite | Self::Generic => r"'|/\*|\*/",
        }
    }

    /// Builds the filter that redacts literals from the statements attached to
    /// [`SQL_TAG`] reports.
    pub fn redaction(self) -> Result<PatternRedaction, regex::Error> {
        let patterns = self
            .patterns()
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        let guard = Regex::new(self.leftover_guard())?;

        Ok(PatternRedaction::new(SQL_TAG, patterns, REPLACEMENT)
            .with_leftover_guard(guard, UNFILTERED_NOTICE))
    }
}

/// Reports a failed SQL statement. The statement travels as the performance
/// attachment, so that the SQL redaction filter can scrub it before delivery.
///
/// Nothing is reported unless the notifier declared the
/// [`sql`](crate::integration::Capabilities::sql) capability, since only then
/// is a redaction filter guaranteed to be in place.
pub fn report_query_failure(
    notifier: &Notifier,
    fault: &dyn Fault,
    statement: &str,
    duration: Option<Duration>,
) -> Option<Submission> {
    if notifier.capabilities().sql().is_none() {
        tracing::debug!(
            statement_len = statement.len(),
            "SQL capability not declared; query failure not reported",
        );
        return None;
    }

    let event = Event::new(fault)
        .with_tag(SQL_TAG)
        .with_performance(PerformanceTag::new(SQL_TAG, statement, duration));

    Some(notifier.ingest(event))
}
