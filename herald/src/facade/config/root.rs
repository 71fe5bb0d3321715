use crate::{HeraldConfigError, NotifierConfig};
use config::ConfigError;
use herald_config::{Assembler, AssemblerChoices, DotEnv};
use herald_factory::impl_deserialize_field;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt::Formatter;

/// The root of the configuration tree: one field per top-level section.
///
/// ```
/// use herald::HeraldConfig;
///
/// let config: HeraldConfig = serde_json::from_str(r#"{
///     "notifier": { "endpoint": "https://errors.example.com/reports", "workers": 2 }
/// }"#).unwrap();
///
/// assert_eq!(config.notifier().workers(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeraldConfig {
    notifier: NotifierConfig,

    #[cfg(feature = "tracing")]
    tracing: herald_tracing::TracingConfig,
}

impl HeraldConfig {
    /// Loads the configuration: dot-env files first, then every applicable
    /// config file and the environment variables, as chosen.
    ///
    /// Missing sections fall back to their defaults; a missing config
    /// directory is not an error.
    pub fn load(choices: &AssemblerChoices) -> Result<Self, HeraldConfigError> {
        DotEnv::tap();

        let proxy = Assembler::make_builder(choices)
            .build()
            .map_err(HeraldConfigError::Assemble)?;

        match proxy.try_deserialize::<Self>() {
            Ok(config) => Ok(config),
            Err(ConfigError::NotFound(key)) => {
                tracing::debug!(key, "Configuration not found; using defaults");
                Ok(Self::default())
            }
            Err(error) => Err(HeraldConfigError::Invalid(error)),
        }
    }

    /// The `notifier` section.
    pub fn notifier(&self) -> &NotifierConfig {
        &self.notifier
    }

    /// The `tracing` section.
    #[cfg(feature = "tracing")]
    pub fn tracing(&self) -> &herald_tracing::TracingConfig {
        &self.tracing
    }
}

const _: () = {
    impl<'de> Deserialize<'de> for HeraldConfig {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_map(HeraldConfigVisitor)
        }
    }

    struct HeraldConfigVisitor;

    impl<'de> Visitor<'de> for HeraldConfigVisitor {
        type Value = HeraldConfig;

        fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
            formatter.write_str("a map of herald configuration")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut notifier = None;

            #[cfg(feature = "tracing")]
            let mut tracing = None;

            while let Some(key) = map.next_key()? {
                match key {
                    HeraldConfigField::notifier => key.poll(&mut map, &mut notifier)?,

                    #[cfg(feature = "tracing")]
                    HeraldConfigField::tracing => key.poll(&mut map, &mut tracing)?,
                    #[cfg(not(feature = "tracing"))]
                    HeraldConfigField::tracing => map.next_value()?,

                    HeraldConfigField::__ignore => map.next_value()?,
                };
            }

            Ok(HeraldConfig {
                notifier: notifier.unwrap_or_default(),

                #[cfg(feature = "tracing")]
                tracing: tracing.unwrap_or_default(),
            })
        }
    }

    impl_deserialize_field!(
        HeraldConfigField,
        herald_deserialize::Slug::eq_as_slugs,
        notifier | herald | reporting,
        tracing | logging | log,
    );
};
