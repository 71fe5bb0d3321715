use crate::{ActiveEnvironment, Scanner};
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

/// A small facade for assembling the layered [`ConfigBuilder`].
pub struct Assembler;

/// Preferences accepted by the [`Assembler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblerChoices {
    /// The config directory name or path, passed to
    /// [`Scanner::resolve_config_dir`].
    pub dir_name: Option<String>,
    /// The environment whose specific files are applied. Defaults to the
    /// [active](ActiveEnvironment::name) one.
    pub environment: Option<String>,
    /// Whether to add the [`Environment`] source.
    pub env_enabled: bool,
    /// The prefix of the environment variables read.
    pub env_prefix: Option<String>,
    /// The separator between prefix and nested key segments.
    pub env_separator: Option<String>,
}

impl Default for AssemblerChoices {
    fn default() -> Self {
        Self {
            dir_name: Some("config".to_string()),
            environment: None,
            env_enabled: true,
            env_prefix: Some("HERALD".to_string()),
            env_separator: Some("__".to_string()),
        }
    }
}

impl Assembler {
    /// Creates a [`ConfigBuilder`] with every applicable config file as a
    /// source, followed by the environment variables, if enabled.
    pub fn make_builder(choices: &AssemblerChoices) -> ConfigBuilder<DefaultState> {
        let mut builder = ConfigBuilder::<DefaultState>::default();

        let dir = Scanner::resolve_config_dir(choices.dir_name.as_deref());
        let environment = choices
            .environment
            .as_deref()
            .unwrap_or_else(|| ActiveEnvironment::name());

        for file in Scanner::find_config_files(&dir, environment) {
            builder = builder.add_source(config::File::from(file));
        }

        if choices.env_enabled {
            let mut env_source = Environment::default();

            if let Some(prefix) = choices.env_prefix.as_deref() {
                env_source = env_source.prefix(prefix);
            }

            if let Some(separator) = choices.env_separator.as_deref() {
                env_source = env_source.separator(separator);
            }

            builder = builder.add_source(env_source);
        }

        builder
    }
}
