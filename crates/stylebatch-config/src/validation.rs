//! Configuration validation.
//!
//! Every section is checked and all problems are reported together, so a
//! misconfigured deployment fails at startup with the full list.

use crate::{AppConfig, QueueBackend, StorageBackend};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// Port number is invalid (must be 1-65535).
    InvalidPort { name: String, value: u16 },
    /// Pool size configuration is invalid (min must be <= max).
    InvalidPoolSize { min: u32, max: u32 },
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { value: u32, maximum: u32 },
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Timeout value must be positive.
    NonPositiveTimeout { name: String, value: u64 },
    /// A numeric setting is outside its allowed range.
    OutOfRange {
        name: String,
        value: u64,
        minimum: u64,
        maximum: u64,
    },
    /// A required string setting is empty.
    Missing { name: String },
    /// Cron expression does not parse.
    InvalidSchedule { value: String, message: String },
    /// Sampling ratio must be between 0.0 and 1.0.
    InvalidSamplingRatio { value: f64 },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// Log format is invalid.
    InvalidLogFormat { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPort { name, value } => {
                write!(f, "Invalid port for {}: {} (must be 1-65535)", name, value)
            }
            Self::InvalidPoolSize { min, max } => {
                write!(
                    f,
                    "Invalid pool size: min ({}) cannot be greater than max ({})",
                    min, max
                )
            }
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(f, "Pool size {} exceeds maximum allowed ({})", value, maximum)
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::NonPositiveTimeout { name, value } => {
                write!(f, "Timeout '{}' must be positive, got {}", name, value)
            }
            Self::OutOfRange {
                name,
                value,
                minimum,
                maximum,
            } => {
                write!(
                    f,
                    "'{}' is {} (must be between {} and {})",
                    name, value, minimum, maximum
                )
            }
            Self::Missing { name } => write!(f, "'{}' must not be empty", name),
            Self::InvalidSchedule { value, message } => {
                write!(f, "Invalid cron schedule '{}': {}", value, message)
            }
            Self::InvalidSamplingRatio { value } => {
                write!(
                    f,
                    "Invalid sampling ratio: {} (must be between 0.0 and 1.0)",
                    value
                )
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
            Self::InvalidLogFormat { value } => {
                write!(f, "Invalid log format: '{}' (valid: json, pretty)", value)
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result of configuration validation containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<ConfigValidationError>,
}

impl ValidationResult {
    fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the validation errors.
    pub fn errors(&self) -> &[ConfigValidationError] {
        &self.errors
    }

    /// Converts to Result, returning Err with all errors if any exist.
    pub fn into_result(self) -> Result<(), Vec<ConfigValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: u32 = 1000;
    /// Largest batch a single drain may lease.
    pub const MAX_BATCH_SIZE: u64 = 100;
    /// Longest lease, 12 hours.
    pub const MAX_VISIBILITY_TIMEOUT_SECS: u64 = 43_200;
    /// Largest lease budget per work item.
    pub const MAX_ATTEMPTS: u64 = 100;
    /// Upper bound on concurrent drains per scheduler tick.
    const MAX_INVOCATIONS: u64 = 32;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut result = ValidationResult::default();

        Self::validate_server(config, &mut result);
        Self::validate_database(config, &mut result);
        Self::validate_redis(config, &mut result);
        Self::validate_queue(config, &mut result);
        Self::validate_worker(config, &mut result);
        Self::validate_generation(config, &mut result);
        Self::validate_storage(config, &mut result);
        Self::validate_observability(config, &mut result);

        result.into_result()
    }

    fn check_range(name: &str, value: u64, minimum: u64, maximum: u64, result: &mut ValidationResult) {
        if value < minimum || value > maximum {
            result.add_error(ConfigValidationError::OutOfRange {
                name: name.to_string(),
                value,
                minimum,
                maximum,
            });
        }
    }

    fn check_timeout(name: &str, value: u64, result: &mut ValidationResult) {
        if value == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: name.to_string(),
                value,
            });
        }
    }

    fn check_http_url(url_type: &str, value: &str, result: &mut ValidationResult) {
        match Url::parse(value) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => result.add_error(ConfigValidationError::InvalidUrl {
                url_type: url_type.to_string(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Err(e) => result.add_error(ConfigValidationError::InvalidUrl {
                url_type: url_type.to_string(),
                message: format!("Invalid URL format: {} ({})", value, e),
            }),
        }
    }

    fn validate_server(config: &AppConfig, result: &mut ValidationResult) {
        let server = &config.server;
        if server.port == 0 {
            result.add_error(ConfigValidationError::InvalidPort {
                name: "server.port".to_string(),
                value: server.port,
            });
        }
        Self::check_timeout("server.request_timeout_secs", server.request_timeout_secs, result);
    }

    fn validate_database(config: &AppConfig, result: &mut ValidationResult) {
        let database = &config.database;
        if database.url.is_empty() {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: "URL cannot be empty".to_string(),
            });
        } else if !database.url.starts_with("mysql://") {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: "URL must start with mysql://".to_string(),
            });
        }

        if database.min_connections > database.max_connections {
            result.add_error(ConfigValidationError::InvalidPoolSize {
                min: database.min_connections,
                max: database.max_connections,
            });
        }
        if database.max_connections > Self::MAX_POOL_SIZE {
            result.add_error(ConfigValidationError::PoolSizeTooLarge {
                value: database.max_connections,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        Self::check_timeout("database.connect_timeout_secs", database.connect_timeout_secs, result);
        Self::check_timeout("database.idle_timeout_secs", database.idle_timeout_secs, result);
    }

    fn validate_redis(config: &AppConfig, result: &mut ValidationResult) {
        if config.queue.backend != QueueBackend::Redis {
            return;
        }

        let redis = &config.redis;
        if !redis.url.starts_with("redis://") && !redis.url.starts_with("rediss://") {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "URL must start with redis:// or rediss://".to_string(),
            });
        }
        if redis.pool_size > Self::MAX_POOL_SIZE {
            result.add_error(ConfigValidationError::PoolSizeTooLarge {
                value: redis.pool_size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }
    }

    fn validate_queue(config: &AppConfig, result: &mut ValidationResult) {
        let queue = &config.queue;
        if queue.name.trim().is_empty() {
            result.add_error(ConfigValidationError::Missing {
                name: "queue.name".to_string(),
            });
        }
        Self::check_range(
            "queue.batch_size",
            u64::from(queue.batch_size),
            1,
            Self::MAX_BATCH_SIZE,
            result,
        );
        Self::check_range(
            "queue.visibility_timeout_secs",
            queue.visibility_timeout_secs,
            1,
            Self::MAX_VISIBILITY_TIMEOUT_SECS,
            result,
        );
        Self::check_range(
            "queue.max_attempts",
            u64::from(queue.max_attempts),
            1,
            Self::MAX_ATTEMPTS,
            result,
        );
    }

    fn validate_worker(config: &AppConfig, result: &mut ValidationResult) {
        let worker = &config.worker;
        if !worker.enabled {
            return;
        }

        if let Err(e) = cron::Schedule::from_str(&worker.schedule) {
            result.add_error(ConfigValidationError::InvalidSchedule {
                value: worker.schedule.clone(),
                message: e.to_string(),
            });
        }
        Self::check_range(
            "worker.invocations",
            u64::from(worker.invocations),
            1,
            Self::MAX_INVOCATIONS,
            result,
        );
    }

    fn validate_generation(config: &AppConfig, result: &mut ValidationResult) {
        Self::check_http_url("generation", &config.generation.base_url, result);
        Self::check_timeout("generation.timeout_secs", config.generation.timeout_secs, result);
    }

    fn validate_storage(config: &AppConfig, result: &mut ValidationResult) {
        let storage = &config.storage;
        if storage.bucket.trim().is_empty() {
            result.add_error(ConfigValidationError::Missing {
                name: "storage.bucket".to_string(),
            });
        }
        if storage.backend != StorageBackend::Http {
            return;
        }

        Self::check_http_url("storage", &storage.base_url, result);
        if let Some(public) = &storage.public_base_url {
            Self::check_http_url("storage public", public, result);
        }
        Self::check_timeout("storage.timeout_secs", storage.timeout_secs, result);
        Self::check_range(
            "storage.list_page_size",
            u64::from(storage.list_page_size),
            1,
            1000,
            result,
        );
    }

    fn validate_observability(config: &AppConfig, result: &mut ValidationResult) {
        let observability = &config.observability;
        let level = observability.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ConfigValidationError::InvalidLogLevel {
                value: observability.log_level.clone(),
            });
        }

        let format = observability.log_format.to_lowercase();
        if format != "json" && format != "pretty" {
            result.add_error(ConfigValidationError::InvalidLogFormat {
                value: observability.log_format.clone(),
            });
        }

        if !(0.0..=1.0).contains(&observability.sampling_ratio) {
            result.add_error(ConfigValidationError::InvalidSamplingRatio {
                value: observability.sampling_ratio,
            });
        }

        if let Some(ref endpoint) = observability.otlp_endpoint {
            if Url::parse(endpoint).is_err() {
                result.add_error(ConfigValidationError::InvalidUrl {
                    url_type: "otlp_endpoint".to_string(),
                    message: format!("Invalid URL format: {}", endpoint),
                });
            }
        }

        if !observability.metrics_path.starts_with('/') {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "metrics_path".to_string(),
                message: "path must start with '/'".to_string(),
            });
        }
    }
}

/// Formats validation errors for display.
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    let mut output = String::from("Configuration validation failed:\n");
    for (i, error) in errors.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, error));
    }
    output
}
