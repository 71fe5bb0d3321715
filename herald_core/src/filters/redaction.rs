use crate::{Filter, FilterError, Report, Verdict};
use regex::Regex;

/// Replaces every match of a set of patterns inside the performance body of
/// reports whose performance tag has the given name.
///
/// Patterns are applied in order, each to the output of the previous one. An
/// optional leftover guard is checked afterwards: if it still matches, the
/// redaction is considered unreliable and the whole body is replaced with a
/// fixed notice.
#[derive(Debug, Clone)]
pub struct PatternRedaction {
    name: String,
    tag_name: String,
    patterns: Vec<Regex>,
    replacement: String,
    guard: Option<(Regex, String)>,
}

impl PatternRedaction {
    /// Creates a redaction of the given patterns inside performance tags named
    /// `tag_name`, replacing each match with `replacement`.
    pub fn new(
        tag_name: impl Into<String>,
        patterns: Vec<Regex>,
        replacement: impl Into<String>,
    ) -> Self {
        let tag_name = tag_name.into();

        Self {
            name: format!("{}-redaction", tag_name),
            tag_name,
            patterns,
            replacement: replacement.into(),
            guard: None,
        }
    }

    /// Overrides the filter name.
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Replaces the whole body with `notice` whenever `guard` still matches
    /// after redaction.
    pub fn with_leftover_guard(self, guard: Regex, notice: impl Into<String>) -> Self {
        Self {
            guard: Some((guard, notice.into())),
            ..self
        }
    }

    /// Applies the redaction to a standalone body.
    pub fn redact(&self, body: &str) -> String {
        let mut redacted = body.to_string();

        for pattern in &self.patterns {
            redacted = pattern
                .replace_all(&redacted, self.replacement.as_str())
                .into_owned();
        }

        match self.guard {
            Some((ref guard, ref notice)) if guard.is_match(&redacted) => notice.clone(),
            _ => redacted,
        }
    }
}

impl Filter for PatternRedaction {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, report: &mut Report) -> Result<Verdict, FilterError> {
        if let Some(performance) = report.performance_mut() {
            if performance.name == self.tag_name {
                performance.body = self.redact(&performance.body);
            }
        }

        Ok(Verdict::Keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Context, Normalizer, PerformanceTag, RawFault};
    use pretty_assertions::assert_eq;

    fn literals() -> PatternRedaction {
        PatternRedaction::new(
            "sql",
            vec![
                Regex::new(r"'(?:[^']|'')*'").unwrap(),
                Regex::new(r"\b\d+\b").unwrap(),
            ],
            "?",
        )
    }

    fn report_with(performance: PerformanceTag) -> Report {
        let mut report = Normalizer::default()
            .normalize(&RawFault::new("QueryFailed", ""), Context::new())
            .unwrap();
        report.set_performance(Some(performance));

        report
    }

    #[test]
    fn redacts_matching_tag() {
        // Given
        let filter = literals();
        let mut report = report_with(PerformanceTag::new(
            "sql",
            "SELECT * FROM users WHERE name = 'O''Brien' AND age > 30",
            None,
        ));

        // When
        filter.apply(&mut report).unwrap();

        // Then
        assert_eq!(
            report.performance().unwrap().body,
            "SELECT * FROM users WHERE name = ? AND age > ?",
        );
        assert_eq!(filter.name(), "sql-redaction");
    }

    #[test]
    fn leaves_other_tags_alone() {
        // Given
        let filter = literals();
        let mut report = report_with(PerformanceTag::new("http", "GET /users/42", None));

        // When
        filter.apply(&mut report).unwrap();

        // Then
        assert_eq!(report.performance().unwrap().body, "GET /users/42");
    }

    #[test]
    fn guard_replaces_unreliable_output() {
        // Given
        let filter = literals().with_leftover_guard(Regex::new("'").unwrap(), "[unfilterable]");

        // Then
        assert_eq!(filter.redact("SELECT 'unterminated"), "[unfilterable]");
        assert_eq!(filter.redact("SELECT 'ok'"), "SELECT ?");
    }
}
