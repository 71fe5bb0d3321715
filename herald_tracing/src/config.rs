use crate::{FormatFlavor, Verbosity};
use herald_factory::impl_deserialize_field;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt::Formatter;

pub mod flavor;
pub mod verbosity;

/// The `tracing` configuration section: how log output is filtered and laid
/// out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    verbosity: Verbosity,
    notifier_verbosity: Option<Verbosity>,
    flavor: FormatFlavor,
    color: bool,
    show_timestamp: bool,
    show_target: bool,
    show_level: bool,
    show_thread_id: bool,
    show_location: bool,
    targets: BTreeMap<String, Verbosity>,
}

impl TracingConfig {
    /// Adds or replaces the verbosity of one target.
    pub fn with_target(mut self, target: impl Into<String>, verbosity: Verbosity) -> Self {
        self.targets.insert(target.into(), verbosity);

        self
    }

    /// Sets the verbosity of every `herald*` target.
    pub fn with_notifier_verbosity(self, verbosity: Verbosity) -> Self {
        Self {
            notifier_verbosity: Some(verbosity),
            ..self
        }
    }
}

impl TracingConfig {
    /// Verbosity of targets with no specific override.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Verbosity of the notifier's own targets, if set apart from the root.
    pub fn notifier_verbosity(&self) -> Option<Verbosity> {
        self.notifier_verbosity
    }

    /// Output layout.
    pub fn flavor(&self) -> FormatFlavor {
        self.flavor
    }

    /// Whether ANSI colors are used.
    pub fn color(&self) -> bool {
        self.color
    }

    /// Whether lines start with a timestamp.
    pub fn show_timestamp(&self) -> bool {
        self.show_timestamp
    }

    /// Whether the event target is shown.
    pub fn show_target(&self) -> bool {
        self.show_target
    }

    /// Whether the event level is shown.
    pub fn show_level(&self) -> bool {
        self.show_level
    }

    /// Whether the emitting thread's ID is shown.
    pub fn show_thread_id(&self) -> bool {
        self.show_thread_id
    }

    /// Whether the source file and line of the event are shown.
    pub fn show_location(&self) -> bool {
        self.show_location
    }

    /// Per-target verbosity overrides.
    pub fn targets(&self) -> &BTreeMap<String, Verbosity> {
        &self.targets
    }
}

impl TracingConfig {
    fn default_color() -> bool {
        true
    }

    fn default_show_timestamp() -> bool {
        true
    }

    fn default_show_target() -> bool {
        true
    }

    fn default_show_level() -> bool {
        true
    }

    fn default_show_thread_id() -> bool {
        false
    }

    fn default_show_location() -> bool {
        false
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::default(),
            notifier_verbosity: None,
            flavor: FormatFlavor::default(),
            color: Self::default_color(),
            show_timestamp: Self::default_show_timestamp(),
            show_target: Self::default_show_target(),
            show_level: Self::default_show_level(),
            show_thread_id: Self::default_show_thread_id(),
            show_location: Self::default_show_location(),
            targets: BTreeMap::new(),
        }
    }
}

impl AsRef<TracingConfig> for TracingConfig {
    fn as_ref(&self) -> &TracingConfig {
        self
    }
}

const _: () = {
    impl<'de> Deserialize<'de> for TracingConfig {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_map(TracingConfigVisitor)
        }
    }

    struct TracingConfigVisitor;

    impl<'de> Visitor<'de> for TracingConfigVisitor {
        type Value = TracingConfig;

        fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
            formatter.write_str("a map of logging configuration")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut verbosity = None;
            let mut notifier_verbosity = None;
            let mut flavor = None;
            let mut color = None;
            let mut show_timestamp = None;
            let mut show_target = None;
            let mut show_level = None;
            let mut show_thread_id = None;
            let mut show_location = None;
            let mut targets = None;

            while let Some(key) = map.next_key()? {
                match key {
                    TracingConfigField::verbosity => key.poll(&mut map, &mut verbosity)?,
                    TracingConfigField::notifier_verbosity => {
                        key.poll(&mut map, &mut notifier_verbosity)?
                    }
                    TracingConfigField::flavor => key.poll(&mut map, &mut flavor)?,
                    TracingConfigField::color => key.poll(&mut map, &mut color)?,
                    TracingConfigField::show_timestamp => {
                        key.poll(&mut map, &mut show_timestamp)?
                    }
                    TracingConfigField::show_target => key.poll(&mut map, &mut show_target)?,
                    TracingConfigField::show_level => key.poll(&mut map, &mut show_level)?,
                    TracingConfigField::show_thread_id => {
                        key.poll(&mut map, &mut show_thread_id)?
                    }
                    TracingConfigField::show_location => {
                        key.poll(&mut map, &mut show_location)?
                    }
                    TracingConfigField::targets => key.poll(&mut map, &mut targets)?,
                    TracingConfigField::__ignore => map.next_value()?,
                };
            }

            Ok(TracingConfig {
                verbosity: verbosity.unwrap_or_default(),
                notifier_verbosity,
                flavor: flavor.unwrap_or_default(),
                color: color.unwrap_or_else(TracingConfig::default_color),
                show_timestamp: show_timestamp
                    .unwrap_or_else(TracingConfig::default_show_timestamp),
                show_target: show_target.unwrap_or_else(TracingConfig::default_show_target),
                show_level: show_level.unwrap_or_else(TracingConfig::default_show_level),
                show_thread_id: show_thread_id
                    .unwrap_or_else(TracingConfig::default_show_thread_id),
                show_location: show_location
                    .unwrap_or_else(TracingConfig::default_show_location),
                targets: targets.unwrap_or_default(),
            })
        }
    }

    impl_deserialize_field!(
        TracingConfigField,
        herald_deserialize::Slug::eq_as_slugs,
        verbosity | level,
        notifier_verbosity | notifier_level | herald_verbosity | herald_level,
        flavor | flavour | format,
        color | colour | with_color | with_colour | ansi,
        show_timestamp | with_timestamp | timestamp,
        show_target | with_target,
        show_level | with_level,
        show_thread_id | with_thread_id,
        show_location | with_location | show_file_and_line,
        targets | target_verbosity,
    );
};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_empty() {
        // Given
        let input = "{}";

        // When
        let actual_output = serde_yml::from_str::<TracingConfig>(input).unwrap();

        // Then
        assert_eq!(actual_output, TracingConfig::default());
    }

    #[test]
    fn from_full() {
        // Given
        let input = r#"
level: warn
HeraldVerbosity: debug
format: compact
colour: false
show-timestamp: false
show_target: false
show_level: true
with_thread_id: true
show_location: true
targets:
    hyper: off
    my_app::billing: trace
"#;
        let expected_output = TracingConfig {
            verbosity: Verbosity::Warn,
            notifier_verbosity: Some(Verbosity::Debug),
            flavor: FormatFlavor::Compact,
            color: false,
            show_timestamp: false,
            show_target: false,
            show_level: true,
            show_thread_id: true,
            show_location: true,
            targets: BTreeMap::from([
                ("hyper".to_string(), Verbosity::Off),
                ("my_app::billing".to_string(), Verbosity::Trace),
            ]),
        };

        // When
        let actual_output = serde_yml::from_str::<TracingConfig>(input).unwrap();

        // Then
        assert_eq!(actual_output, expected_output);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        // Given
        let input = "verbosity: warn\nlevel: info\n";

        // When
        let actual_output = serde_yml::from_str::<TracingConfig>(input);

        // Then
        assert!(actual_output.is_err());
    }

    #[test]
    fn builder_methods() {
        // When
        let config = TracingConfig::default()
            .with_target("sqlx", Verbosity::Warn)
            .with_notifier_verbosity(Verbosity::Off);

        // Then
        assert_eq!(config.targets().get("sqlx"), Some(&Verbosity::Warn));
        assert_eq!(config.notifier_verbosity(), Some(Verbosity::Off));
    }
}
