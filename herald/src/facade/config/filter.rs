use crate::integration::sql::SqlDialect;
use herald_core::Filter;
use herald_core::filters::{IgnoreKinds, KeysBlocklist};
use herald_deserialize::OneOrMany;
use herald_factory::impl_deserialize_field;
use serde::de::{Error, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt::Formatter;

/// The kinds of filter that can be declared in configuration.
#[derive(herald_factory::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[herald(eq_fn = herald_deserialize::Slug::eq_as_slugs)]
pub enum FilterKind {
    /// See [`FilterSpec::KeysBlocklist`].
    #[herald(alias = "blocklist", alias = "blacklist", alias = "redact_keys")]
    KeysBlocklist,

    /// See [`FilterSpec::IgnoreKinds`].
    #[herald(alias = "ignore", alias = "ignore_types", alias = "ignore_errors")]
    IgnoreKinds,

    /// See [`FilterSpec::Sql`].
    #[herald(alias = "sql_redaction", alias = "sql_filter")]
    Sql,
}

/// A filter declared in the `filters` list of the notifier configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSpec {
    /// Redact context values by key: `keys` are matched literally and without
    /// regard to case, `patterns` are regular expressions.
    KeysBlocklist {
        /// Literal keys.
        keys: Vec<String>,
        /// Key patterns.
        patterns: Vec<String>,
        /// Position in the chain.
        priority: i32,
    },

    /// Discard reports of the listed fault types.
    IgnoreKinds {
        /// Fault types to discard.
        kinds: Vec<String>,
        /// Position in the chain.
        priority: i32,
    },

    /// Redact literals from SQL statements attached to reports.
    Sql {
        /// The database's dialect.
        dialect: SqlDialect,
        /// Position in the chain.
        priority: i32,
    },
}

impl FilterSpec {
    /// The filter's position in the chain.
    pub fn priority(&self) -> i32 {
        match *self {
            Self::KeysBlocklist { priority, .. }
            | Self::IgnoreKinds { priority, .. }
            | Self::Sql { priority, .. } => priority,
        }
    }

    /// Builds the declared filter.
    pub fn build(&self) -> Result<Box<dyn Filter>, regex::Error> {
        let filter: Box<dyn Filter> = match self {
            Self::KeysBlocklist { keys, patterns, .. } => {
                let literal = keys
                    .iter()
                    .map(|key| format!("(?i){}", regex::escape(key)));
                let all = literal.chain(patterns.iter().cloned());

                Box::new(KeysBlocklist::new(all)?)
            }
            Self::IgnoreKinds { kinds, .. } => Box::new(IgnoreKinds::new(kinds)),
            Self::Sql { dialect, .. } => Box::new(dialect.redaction()?),
        };

        Ok(filter)
    }
}

const _: () = {
    impl<'de> Deserialize<'de> for FilterSpec {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_map(FilterSpecVisitor)
        }
    }

    struct FilterSpecVisitor;

    impl<'de> Visitor<'de> for FilterSpecVisitor {
        type Value = FilterSpec;

        fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
            formatter.write_str("a map describing a report filter")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut kind: Option<FilterKind> = None;
            let mut keys: Option<OneOrMany<String>> = None;
            let mut patterns: Option<OneOrMany<String>> = None;
            let mut kinds: Option<OneOrMany<String>> = None;
            let mut dialect: Option<SqlDialect> = None;
            let mut priority: Option<i32> = None;

            while let Some(key) = map.next_key()? {
                match key {
                    FilterSpecField::kind => key.poll(&mut map, &mut kind)?,
                    FilterSpecField::keys => key.poll(&mut map, &mut keys)?,
                    FilterSpecField::patterns => key.poll(&mut map, &mut patterns)?,
                    FilterSpecField::kinds => key.poll(&mut map, &mut kinds)?,
                    FilterSpecField::dialect => key.poll(&mut map, &mut dialect)?,
                    FilterSpecField::priority => key.poll(&mut map, &mut priority)?,
                    FilterSpecField::__ignore => map.next_value()?,
                };
            }

            let kind = FilterSpecField::kind.take::<_, A::Error>(kind)?;
            let priority = priority.unwrap_or_default();

            let spec = match kind {
                FilterKind::KeysBlocklist => {
                    let keys = Vec::from(keys.unwrap_or_default());
                    let patterns = Vec::from(patterns.unwrap_or_default());
                    if keys.is_empty() && patterns.is_empty() {
                        return Err(Error::custom(
                            "a keys blocklist needs at least one of `keys` or `patterns`",
                        ));
                    }
                    FilterSpec::KeysBlocklist {
                        keys,
                        patterns,
                        priority,
                    }
                }
                FilterKind::IgnoreKinds => FilterSpec::IgnoreKinds {
                    kinds: Vec::from(FilterSpecField::kinds.take::<_, A::Error>(kinds)?),
                    priority,
                },
                FilterKind::Sql => FilterSpec::Sql {
                    dialect: dialect.unwrap_or_default(),
                    priority,
                },
            };

            Ok(spec)
        }
    }

    impl_deserialize_field!(
        FilterSpecField,
        herald_deserialize::Slug::eq_as_slugs,
        kind | filter,
        keys | key,
        patterns | pattern | regex,
        kinds | ignore | types,
        dialect | adapter,
        priority | order,
    );
};
