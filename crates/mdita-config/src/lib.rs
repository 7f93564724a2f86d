//! Configuration management for mdita.
//!
//! Rendering options are identified by typed [`DataKey`]s (see [`keys`]).
//! A [`DataSet`] holds explicitly set values and is immutable once built;
//! [`ScopedDataSet`] layers a narrower scope, such as per-document options,
//! over a broader one.
//!
//! Options can also be loaded from an `mdita.toml` file:
//!
//! ```toml
//! [render]
//! escape_html = true
//! indent_size = 2
//! ```

mod data_set;
mod key;
pub mod keys;

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub use data_set::{DataSet, DataSetBuilder, OptionSource, ScopedDataSet};
pub use key::{AnyKey, DataKey, OptionType, OptionValue, StaticValue, ValueKind};

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdita.toml";

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Option name not in the schema.
    #[error("Unknown option: {0}")]
    UnknownOption(String),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

/// Raw configuration file as parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    render: toml::Table,
}

/// Loaded configuration.
#[derive(Debug, Default)]
pub struct MditaConfig {
    /// Rendering options from the `[render]` table.
    pub options: DataSet,
    /// Path to the config file (set after loading).
    pub config_path: Option<PathBuf>,
}

impl MditaConfig {
    /// Load configuration.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise,
    /// searches for `mdita.toml` in the current directory and its parents,
    /// falling back to defaults when none is found.
    ///
    /// `overrides` are applied after loading and take precedence over
    /// values from the file.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        overrides: Option<&DataSet>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else {
            let cwd = std::env::current_dir()?;
            match Self::discover_config(&cwd) {
                Some(discovered) => Self::load_from_file(&discovered)?,
                None => Self::default(),
            }
        };

        if let Some(overrides) = overrides {
            config.options = DataSet::builder()
                .extend(&config.options)
                .extend(overrides)
                .build();
        }

        Ok(config)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns error on malformed TOML, unknown options or mistyped values.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        let mut builder = DataSet::builder();
        for (name, value) in &file.render {
            builder = builder.set_raw(&name.to_ascii_uppercase(), convert_value(name, value)?)?;
        }
        Ok(Self {
            options: builder.build(),
            config_path: None,
        })
    }

    /// Search for config file in `start` and its parents.
    fn discover_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }
}

fn convert_value(name: &str, value: &toml::Value) -> Result<OptionValue, ConfigError> {
    match value {
        toml::Value::Boolean(b) => Ok(OptionValue::Bool(*b)),
        toml::Value::Integer(i) => Ok(OptionValue::Int(*i)),
        toml::Value::String(s) => Ok(OptionValue::Str(s.clone())),
        other => Err(ConfigError::Validation(format!(
            "{name} has unsupported value type {}",
            other.type_str()
        ))),
    }
}
