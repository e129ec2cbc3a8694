//! Configuration loader with layered sources.

use crate::{format_validation_errors, AppConfig, ConfigValidator};
use config::{Config, ConfigError, Environment, File};
use std::path::Path;
use stylebatch_core::BatchError;
use tracing::{debug, info, warn};

/// Prefix of every environment variable override.
pub const ENV_PREFIX: &str = "STYLEBATCH";

/// Loads and validates [`AppConfig`] once at startup.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: AppConfig,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Untracked local overrides
    /// 4. Environment variables with `STYLEBATCH_` prefix and `__` separator
    pub fn new(config_dir: impl Into<String>) -> Result<Self, BatchError> {
        let config = Self::load_config(&config_dir.into())?;
        Ok(Self { config })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, BatchError> {
        Self::new("./config")
    }

    /// The loaded configuration.
    #[must_use]
    pub fn get(&self) -> &AppConfig {
        &self.config
    }

    /// Consumes the loader, returning the configuration.
    #[must_use]
    pub fn into_config(self) -> AppConfig {
        self.config
    }

    fn load_config(config_dir: &str) -> Result<AppConfig, BatchError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment = std::env::var(format!("{}_ENVIRONMENT", ENV_PREFIX))
            .unwrap_or_else(|_| "development".to_string());

        info!(environment = %environment, "Loading configuration");

        let mut builder = Config::builder();

        for name in ["default", environment.as_str(), "local"] {
            let path = format!("{}/{}.toml", config_dir, name);
            if Path::new(&path).exists() {
                debug!(path = %path, "Loading config file");
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error_to_batch_error)?;

        let mut app_config: AppConfig = config
            .try_deserialize()
            .map_err(config_error_to_batch_error)?;
        app_config.app.environment = environment;

        Self::validate_config(&app_config)?;

        Ok(app_config)
    }

    /// Fails fast on any validation error.
    fn validate_config(config: &AppConfig) -> Result<(), BatchError> {
        if config.app.environment == "production" && config.storage.service_key.is_empty() {
            warn!("Storage service key is empty in production");
        }

        ConfigValidator::validate(config)
            .map_err(|errors| BatchError::Configuration(format_validation_errors(&errors)))
    }
}

fn config_error_to_batch_error(err: ConfigError) -> BatchError {
    BatchError::Configuration(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_loads_file_layers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            r#"
[queue]
name = "test_jobs"
batch_size = 7

[worker]
enabled = false
"#,
        )
        .unwrap();

        let loader = ConfigLoader::new(dir.path().to_string_lossy().to_string()).unwrap();
        let config = loader.get();
        assert_eq!(config.queue.name, "test_jobs");
        assert_eq!(config.queue.batch_size, 7);
        assert!(!config.worker.enabled);
        // untouched sections keep their defaults
        assert_eq!(config.queue.max_attempts, 3);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            "[queue]\nmax_attempts = 0\n",
        )
        .unwrap();

        let err = ConfigLoader::new(dir.path().to_string_lossy().to_string())
            .err()
            .unwrap();
        assert!(matches!(err, BatchError::Configuration(_)));
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_missing_directory_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::new(dir.path().join("absent").to_string_lossy().to_string())
            .unwrap()
            .into_config();
        assert_eq!(config.queue.name, "image_jobs");
        assert_eq!(config.queue.visibility_timeout_secs, 120);
    }
}
