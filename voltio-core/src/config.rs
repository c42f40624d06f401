use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-level configuration: where the trusted backend authority lives and
/// how the library logs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoreConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("voltio").join("config.toml"));
    }
    paths.push(PathBuf::from("voltio.toml"));
    paths
}

impl CoreConfig {
    /// Load configuration from the default locations, layered under
    /// `VOLTIO_`-prefixed environment overrides
    /// (e.g. `VOLTIO_BACKEND__BASE_URL`).
    pub fn load() -> Result<Self, ConfigLoadError> {
        Self::load_from_paths(default_config_paths())
    }

    pub fn load_from_paths(paths: Vec<PathBuf>) -> Result<Self, ConfigLoadError> {
        let _ = dotenvy::dotenv();

        let mut builder = ConfigBuilder::builder();
        for path in paths {
            if path.exists() {
                builder = builder.add_source(File::from(path).required(false));
            }
        }
        builder = builder.add_source(
            Environment::with_prefix("VOLTIO")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let core_config: CoreConfig = config.try_deserialize().unwrap_or_default();
        core_config.validate()?;
        Ok(core_config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.backend.base_url.is_empty() {
            return Err(ConfigLoadError::InvalidValue {
                key: "backend.base_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if !self.backend.base_url.starts_with("http://")
            && !self.backend.base_url.starts_with("https://")
        {
            return Err(ConfigLoadError::InvalidValue {
                key: "backend.base_url".to_string(),
                message: "must be an http(s) URL".to_string(),
            });
        }
        if self.backend.request_timeout_secs == 0 {
            return Err(ConfigLoadError::InvalidValue {
                key: "backend.request_timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Install the global tracing subscriber according to the logging config.
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    if config.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
