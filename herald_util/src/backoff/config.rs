use herald_factory::impl_deserialize_field;
use humantime::parse_duration;
use serde::de::{Error, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt::Formatter;
use std::time::Duration;

/// Describes how the delay between two delivery attempts grows: the first
/// retry waits roughly `initial_interval`, every following one waits
/// `multiplier` times longer, never more than `max_interval`. Each delay is
/// randomized by `± randomization_factor` of its nominal value.
///
/// Durations are given in human-readable form (`"500ms"`, `"30s"`, `"1m 5s"`).
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    initial_interval: Duration,
    max_interval: Duration,
    randomization_factor: f64,
    multiplier: f64,
}

impl BackoffConfig {
    /// Creates a new backoff definition from its four parameters.
    ///
    /// The randomization factor is clamped into `[0, 1]`, the multiplier is
    /// raised to at least `1`, and the max interval to at least the initial
    /// one.
    pub fn new(
        initial_interval: Duration,
        max_interval: Duration,
        randomization_factor: f64,
        multiplier: f64,
    ) -> Self {
        Self {
            initial_interval,
            max_interval: max_interval.max(initial_interval),
            randomization_factor: randomization_factor.clamp(0.0, 1.0),
            multiplier: multiplier.max(1.0),
        }
    }

    /// Nominal delay before the first retry.
    pub fn initial_interval(&self) -> Duration {
        self.initial_interval
    }

    /// Upper bound on any single delay.
    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// Relative jitter applied to every delay.
    pub fn randomization_factor(&self) -> f64 {
        self.randomization_factor
    }

    /// Growth factor between consecutive delays.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }
}

impl BackoffConfig {
    fn default_initial_interval() -> Duration {
        Duration::from_millis(500)
    }

    fn default_max_interval() -> Duration {
        Duration::from_secs(30)
    }

    fn default_randomization_factor() -> f64 {
        0.5
    }

    fn default_multiplier() -> f64 {
        2.0
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_interval: Self::default_initial_interval(),
            max_interval: Self::default_max_interval(),
            randomization_factor: Self::default_randomization_factor(),
            multiplier: Self::default_multiplier(),
        }
    }
}

impl AsRef<BackoffConfig> for BackoffConfig {
    fn as_ref(&self) -> &BackoffConfig {
        self
    }
}

const _: () = {
    impl<'de> Deserialize<'de> for BackoffConfig {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_map(BackoffConfigVisitor)
        }
    }

    struct BackoffConfigVisitor;

    impl<'de> Visitor<'de> for BackoffConfigVisitor {
        type Value = BackoffConfig;

        fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
            formatter.write_str("a map of retry backoff parameters")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut initial_interval = None;
            let mut max_interval = None;
            let mut randomization_factor = None;
            let mut multiplier = None;

            while let Some(key) = map.next_key()? {
                match key {
                    BackoffConfigField::initial_interval => {
                        initial_interval = Some(next_duration(&mut map)?);
                        IgnoredAny
                    }
                    BackoffConfigField::max_interval => {
                        max_interval = Some(next_duration(&mut map)?);
                        IgnoredAny
                    }
                    BackoffConfigField::randomization_factor => {
                        key.poll(&mut map, &mut randomization_factor)?
                    }
                    BackoffConfigField::multiplier => key.poll(&mut map, &mut multiplier)?,
                    BackoffConfigField::__ignore => map.next_value()?,
                };
            }

            let randomization_factor: f64 =
                randomization_factor.unwrap_or_else(BackoffConfig::default_randomization_factor);
            if !(0.0..=1.0).contains(&randomization_factor) {
                return Err(Error::custom(format!(
                    "randomization factor must be within [0, 1], got {}",
                    randomization_factor,
                )));
            }

            let multiplier: f64 = multiplier.unwrap_or_else(BackoffConfig::default_multiplier);
            if multiplier < 1.0 {
                return Err(Error::custom(format!(
                    "multiplier must be at least 1, got {}",
                    multiplier,
                )));
            }

            Ok(BackoffConfig::new(
                initial_interval.unwrap_or_else(BackoffConfig::default_initial_interval),
                max_interval.unwrap_or_else(BackoffConfig::default_max_interval),
                randomization_factor,
                multiplier,
            ))
        }
    }

    fn next_duration<'de, A>(map: &mut A) -> Result<Duration, A::Error>
    where
        A: MapAccess<'de>,
    {
        let duration_string = map.next_value::<String>()?;

        parse_duration(&duration_string).map_err(Error::custom)
    }

    impl_deserialize_field!(
        BackoffConfigField,
        herald_deserialize::Slug::eq_as_slugs,
        initial_interval | initial | initial_delay,
        max_interval | max | max_delay,
        randomization_factor | jitter,
        multiplier | factor,
    );
};
