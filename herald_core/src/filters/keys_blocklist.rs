use crate::{Filter, FilterError, Report, Verdict};
use regex::RegexSet;

/// Value substituted for redacted context entries.
const FILTERED: &str = "[Filtered]";

/// Redacts context values whose keys match any of the given patterns.
///
/// Patterns are regular expressions matched anywhere in the key, so
/// `password` also covers `user.password_confirmation`. Anchor them to match
/// whole keys.
#[derive(Debug, Clone)]
pub struct KeysBlocklist {
    patterns: RegexSet,
}

impl KeysBlocklist {
    /// Compiles the given patterns.
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            patterns: RegexSet::new(patterns)?,
        })
    }

    /// Builds a blocklist that matches the given keys literally and without
    /// regard to case.
    pub fn literal<I, S>(keys: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            keys.into_iter()
                .map(|key| format!("(?i){}", regex::escape(key.as_ref()))),
        )
    }
}

impl Filter for KeysBlocklist {
    fn name(&self) -> &str {
        "keys-blocklist"
    }

    fn apply(&self, report: &mut Report) -> Result<Verdict, FilterError> {
        for (key, value) in report.context_mut().iter_mut() {
            if self.patterns.is_match(key) {
                *value = FILTERED.to_string();
            }
        }

        Ok(Verdict::Keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Context, Normalizer, RawFault};
    use pretty_assertions::assert_eq;

    fn report_with(context: &[(&str, &str)]) -> Report {
        let context = context
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<Context>();

        Normalizer::default()
            .normalize(&RawFault::new("Boom", ""), context)
            .unwrap()
    }

    #[test]
    fn redacts_matching_keys() {
        // Given
        let filter = KeysBlocklist::new(["password", "^token$"]).unwrap();
        let mut report = report_with(&[
            ("user.password_confirmation", "hunter2"),
            ("token", "abc"),
            ("token_type", "bearer"),
            ("user", "42"),
        ]);

        // When
        let verdict = filter.apply(&mut report).unwrap();

        // Then
        assert_eq!(verdict, Verdict::Keep);
        assert_eq!(report.context()["user.password_confirmation"], FILTERED);
        assert_eq!(report.context()["token"], FILTERED);
        assert_eq!(report.context()["token_type"], "bearer");
        assert_eq!(report.context()["user"], "42");
    }

    #[test]
    fn literal_keys_ignore_case() {
        // Given
        let filter = KeysBlocklist::literal(["api.key"]).unwrap();
        let mut report = report_with(&[("X-API.KEY", "secret"), ("apixkey", "visible")]);

        // When
        filter.apply(&mut report).unwrap();

        // Then
        assert_eq!(report.context()["X-API.KEY"], FILTERED);
        assert_eq!(report.context()["apixkey"], "visible");
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(KeysBlocklist::new(["(unclosed"]).is_err());
    }
}
