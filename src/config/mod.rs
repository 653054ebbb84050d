//! Application configuration.
//!
//! Loaded from YAML files and environment variables with the `config` crate.
//! Every section has defaults, so an empty source set yields a usable config.

mod engine;
mod logging;

pub use engine::{EngineConfig, DEFAULT_SHUTDOWN_TIMEOUT_MS};
pub use logging::{LoggingConfig, DEFAULT_LOG_FILTER};

use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "eventide.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "EVENTIDE_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "EVENTIDE";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "EVENTIDE_LOG";

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dispatch engine settings.
    pub engine: EngineConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Sources, later overriding earlier:
    /// 1. `eventide.yaml` in the current directory (if it exists)
    /// 2. File given by `path` (must exist)
    /// 3. File named by `CONFIG_ENV_VAR` (must exist)
    /// 4. Environment variables such as `EVENTIDE__ENGINE__SHUTDOWN_TIMEOUT_MS`
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        Self {
            engine: EngineConfig {
                shutdown_timeout_ms: 1_000,
            },
            logging: LoggingConfig::default(),
        }
    }
}
