//! Configuration management for metricwatch

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::components::RegistrationMode;
use crate::error::Result;

/// Prefix of environment variables overriding the configuration
pub const ENV_PREFIX: &str = "METRICWATCH";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Monitor definitions
    pub monitors: MonitorsConfig,

    /// Component registry
    pub registry: RegistryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load from an optional file, then `METRICWATCH_*` environment variables
    ///
    /// Nested keys are separated by a double underscore in variable names,
    /// e.g. `METRICWATCH_MONITORS__CACHE_TTL=5m`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Where monitors are defined and how long they are cached
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorsConfig {
    /// File holding `monitor.<id>.*` definitions
    pub source: Option<PathBuf>,
    /// Time before monitor definitions are read again
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
}

impl Default for MonitorsConfig {
    fn default() -> Self {
        Self {
            source: None,
            cache_ttl: Duration::from_secs(60),
        }
    }
}

/// Registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Refuse registering a component name twice
    pub strict: bool,
}

impl RegistryConfig {
    /// Registration mode matching this configuration
    pub fn mode(&self) -> RegistrationMode {
        if self.strict {
            RegistrationMode::Strict
        } else {
            RegistrationMode::Override
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directives
    pub level: String,
    /// Log format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}
