use crate::integration::sql::SqlDialect;
use herald_core::filters::KeysBlocklist;
use herald_core::{Filter, FilterChain};

/// Request attributes that carry credentials.
const REQUEST_SECRETS: &str = r"(?i)^request\.(?:header|param)\..*(?:authorization|cookie|passw(?:or)?d|secret|token|api[-_.]?key|session)";

/// The integrations an application uses, declared once at startup.
///
/// Each capability enables the matching adapter in [`integration`](crate::integration)
/// and brings the filters that adapter relies on: adapters whose capability
/// is not declared report nothing.
///
/// ```
/// use herald::integration::Capabilities;
/// use herald::integration::sql::SqlDialect;
///
/// let capabilities = Capabilities::default()
///     .with_sql(SqlDialect::Postgres)
///     .with_requests();
///
/// assert!(capabilities.requests());
/// assert!(!capabilities.jobs());
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    sql: Option<SqlDialect>,
    jobs: bool,
    requests: bool,
}

impl Capabilities {
    /// Declares a database speaking the given dialect.
    pub fn with_sql(self, dialect: SqlDialect) -> Self {
        Self {
            sql: Some(dialect),
            ..self
        }
    }

    /// Declares a background job runner.
    pub fn with_jobs(self) -> Self {
        Self { jobs: true, ..self }
    }

    /// Declares an HTTP request handler.
    pub fn with_requests(self) -> Self {
        Self {
            requests: true,
            ..self
        }
    }

    /// The declared database dialect.
    pub fn sql(&self) -> Option<SqlDialect> {
        self.sql
    }

    /// Whether a job runner was declared.
    pub fn jobs(&self) -> bool {
        self.jobs
    }

    /// Whether a request handler was declared.
    pub fn requests(&self) -> bool {
        self.requests
    }

    /// Adds the filters the declared capabilities need. A SQL redaction
    /// already in the chain is not added twice.
    pub fn install(&self, chain: &mut FilterChain) -> Result<(), regex::Error> {
        if let Some(dialect) = self.sql {
            let redaction = dialect.redaction()?;
            let present = chain.names().any(|name| name == redaction.name());

            if !present {
                chain.add_filter(redaction, 0);
            }
        }

        if self.requests {
            chain.add_filter(KeysBlocklist::new([REQUEST_SECRETS])?, 0);
        }

        Ok(())
    }
}
