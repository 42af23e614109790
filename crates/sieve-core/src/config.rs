//! Runtime configuration loaded from TOML.

use crate::DEFAULT_LIMIT;
use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

///
/// Config
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub query: QueryConfig,
    pub compile: CompileConfig,
}

impl Config {
    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;

        Ok(config)
    }

    /// Read, parse, and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.default_limit == 0 || i32::try_from(self.query.default_limit).is_err() {
            return Err(ConfigError::Invalid {
                key: "query.default_limit",
                message: format!("{} is out of range", self.query.default_limit),
            });
        }

        let compile = &self.compile;
        for (key, value) in [
            ("compile.root_alias", &compile.root_alias),
            ("compile.join_alias_prefix", &compile.join_alias_prefix),
            ("compile.param_prefix", &compile.param_prefix),
        ] {
            if !is_identifier(value) {
                return Err(ConfigError::Invalid {
                    key,
                    message: format!("'{value}' is not a plain identifier"),
                });
            }
        }

        if compile.join_alias_prefix == compile.param_prefix {
            return Err(ConfigError::Invalid {
                key: "compile.param_prefix",
                message: "must differ from compile.join_alias_prefix".to_string(),
            });
        }
        if compile.root_alias.starts_with(&compile.join_alias_prefix) {
            return Err(ConfigError::Invalid {
                key: "compile.root_alias",
                message: "must not start with compile.join_alias_prefix".to_string(),
            });
        }

        Ok(())
    }
}

fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();

    chars
        .next()
        .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

///
/// QueryConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Page size used when a request leaves the limit at 0 or omits it.
    pub default_limit: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
        }
    }
}

///
/// CompileConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CompileConfig {
    /// Alias of the root entity in rendered query text.
    pub root_alias: String,
    /// Joins are named `<prefix><n>`.
    pub join_alias_prefix: String,
    /// Bound parameters are named `:<prefix><n>`.
    pub param_prefix: String,
    /// Whether the backend accepts ORDER BY columns absent from a DISTINCT
    /// select list.
    pub order_by_without_select: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            root_alias: "mobj".to_string(),
            join_alias_prefix: "j".to_string(),
            param_prefix: "v".to_string(),
            order_by_without_select: false,
        }
    }
}

///
/// TESTS
///
