//! Layered configuration: built-in defaults, an optional YAML file, then
//! `POLICY_CHECK_*` environment variables (`__` separates nested keys).

use std::path::Path;

use anyhow::{Context, Result, ensure};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "POLICY_CHECK_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    /// Resource type assumed for `--resource` values given as a bare path.
    pub default_resource_type: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            default_resource_type: "thing".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG` when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl AppConfig {
    /// Load the layered configuration.
    ///
    /// # Errors
    /// Returns an error if `file` is given but missing, or if any layer holds
    /// unknown keys or values of the wrong type.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::figment(file)?
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("invalid policy-check configuration")
    }

    fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            ensure!(path.is_file(), "config file {} does not exist", path.display());
            figment = figment.merge(Yaml::file(path));
        }
        Ok(figment)
    }
}
