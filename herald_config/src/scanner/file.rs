use config::{File, FileFormat, FileSourceFile};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// A single config file found in the config directory.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ConfigFile {
    /// A file that applies to every environment, like `notifier.toml`.
    Generic {
        /// The path to the file.
        path: PathBuf,
        /// The file's format.
        format: FileFormat,
    },

    /// A file that applies to one environment, like `notifier.production.yaml`.
    Specific {
        /// The path to the file.
        path: PathBuf,
        /// The file's format.
        format: FileFormat,
        /// The environment named in the file name, lowercased.
        environment: String,
    },
}

impl ConfigFile {
    /// Recognizes a config file by its name: `{name}.{ext}` or
    /// `{name}.{environment}.{ext}` with a TOML or YAML extension. Returns
    /// `None` for anything else.
    pub fn try_at(path: PathBuf) -> Option<Self> {
        let name = path.file_name().and_then(std::ffi::OsStr::to_str)?;

        match *name.split('.').collect::<Vec<_>>().as_slice() {
            [stem, extension] if !stem.is_empty() => {
                let format = format_of(extension)?;

                Some(Self::Generic { path, format })
            }
            [stem, environment, extension] if !stem.is_empty() && !environment.is_empty() => {
                let format = format_of(extension)?;
                let environment = environment.to_ascii_lowercase();

                Some(Self::Specific {
                    path,
                    format,
                    environment,
                })
            }
            _ => None,
        }
    }
}

impl ConfigFile {
    /// Reports whether this file applies to every environment.
    pub fn is_generic(&self) -> bool {
        matches!(self, Self::Generic { .. })
    }

    /// The path to the file.
    pub fn path(&self) -> &Path {
        match self {
            Self::Generic { path, .. } | Self::Specific { path, .. } => path,
        }
    }

    /// The file's format.
    pub fn format(&self) -> FileFormat {
        match self {
            Self::Generic { format, .. } | Self::Specific { format, .. } => *format,
        }
    }

    /// The environment this file is restricted to, if any.
    pub fn environment(&self) -> Option<&str> {
        match self {
            Self::Generic { .. } => None,
            Self::Specific { environment, .. } => Some(environment),
        }
    }

    /// Reports whether this file applies to the named environment. Names are
    /// compared case-insensitively.
    pub fn applies_to(&self, environment: &str) -> bool {
        match self.environment() {
            None => true,
            Some(own) => own.eq_ignore_ascii_case(environment),
        }
    }
}

impl PartialOrd for ConfigFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConfigFile {
    /// Generic files come first, so that environment-specific files override
    /// them; within each group files are ordered by path.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .is_generic()
            .cmp(&self.is_generic())
            .then_with(|| self.path().cmp(other.path()))
    }
}

fn format_of(extension: &str) -> Option<FileFormat> {
    if extension.eq_ignore_ascii_case("toml") {
        Some(FileFormat::Toml)
    } else if extension.eq_ignore_ascii_case("yml") || extension.eq_ignore_ascii_case("yaml") {
        Some(FileFormat::Yaml)
    } else {
        None
    }
}

impl From<ConfigFile> for File<FileSourceFile, FileFormat> {
    fn from(file: ConfigFile) -> Self {
        let format = file.format();

        match file {
            ConfigFile::Generic { path, .. } | ConfigFile::Specific { path, .. } => {
                File::from(path).format(format)
            }
        }
    }
}
