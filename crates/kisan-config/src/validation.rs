//! Configuration validation module.
//!
//! Provides validation for all configuration values, failing fast on
//! invalid configuration rather than at runtime.

use crate::{AppConfig, CacheConfig, CacheOverride};
use kisan_core::DataKind;
use std::fmt;
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
    /// Timeout or duration value must be positive.
    NonPositiveTimeout { name: String, value: u64 },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// Backoff factor would shrink delays.
    InvalidBackoffFactor { value: f64 },
    /// Retry count exceeds the allowed maximum.
    TooManyRetries { name: String, value: u32, maximum: u32 },
    /// Rate limit must allow at least one request.
    ZeroRateLimit,
    /// Override keyed by an unknown data kind.
    UnknownDataKind { value: String },
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
                write!(f, "'{}' must be positive, got {}", name, value)
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
            Self::InvalidBackoffFactor { value } => {
                write!(f, "Invalid backoff factor: {} (must be at least 1.0)", value)
            }
            Self::TooManyRetries { name, value, maximum } => {
                write!(f, "'{}' is {} (maximum {})", name, value, maximum)
            }
            Self::ZeroRateLimit => {
                write!(f, "upstream.rate_limit_per_minute must be at least 1")
            }
            Self::UnknownDataKind { value } => {
                write!(f, "Unknown data kind in cache.overrides: '{}'", value)
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result of configuration validation containing all errors found.
#[derive(Debug)]
pub struct ValidationResult {
    errors: Vec<ConfigValidationError>,
}

impl ValidationResult {
    fn new() -> Self {
        Self { errors: Vec::new() }
    }

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
    /// Maximum retries per upstream fetch.
    const MAX_RETRIES: u32 = 10;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut result = ValidationResult::new();

        Self::validate_server(&config.server, &mut result);
        Self::validate_database(&config.database, &mut result);
        Self::validate_redis(&config.redis, &mut result);
        Self::validate_cache(&config.cache, &mut result);
        Self::validate_upstream(&config.upstream, &mut result);
        Self::validate_observability(&config.observability, &mut result);

        result.into_result()
    }

    fn validate_server(config: &crate::ServerConfig, result: &mut ValidationResult) {
        if config.port == 0 {
            result.add_error(ConfigValidationError::InvalidPort {
                name: "server.port".to_string(),
                value: config.port,
            });
        }

        if config.request_timeout_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "server.request_timeout_secs".to_string(),
                value: 0,
            });
        }
    }

    fn validate_database(config: &crate::DatabaseConfig, result: &mut ValidationResult) {
        if !config.enabled {
            return;
        }

        if !config.url.starts_with("mysql://") {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: "URL must start with mysql://".to_string(),
            });
        }

        if config.min_connections > config.max_connections {
            result.add_error(ConfigValidationError::InvalidPoolSize {
                min: config.min_connections,
                max: config.max_connections,
            });
        }
        if config.max_connections > Self::MAX_POOL_SIZE {
            result.add_error(ConfigValidationError::PoolSizeTooLarge {
                value: config.max_connections,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        if config.connect_timeout_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "database.connect_timeout_secs".to_string(),
                value: 0,
            });
        }
    }

    fn validate_redis(config: &crate::RedisConfig, result: &mut ValidationResult) {
        if !config.enabled {
            return;
        }

        if !config.url.starts_with("redis://") && !config.url.starts_with("rediss://") {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "URL must start with redis:// or rediss://".to_string(),
            });
        }

        if config.pool_size == 0 || config.pool_size > Self::MAX_POOL_SIZE {
            result.add_error(ConfigValidationError::PoolSizeTooLarge {
                value: config.pool_size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }
    }

    fn validate_cache(config: &CacheConfig, result: &mut ValidationResult) {
        if config.ttl_minutes == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "cache.ttl_minutes".to_string(),
                value: 0,
            });
        }
        if config.backoff_base_millis == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "cache.backoff_base_millis".to_string(),
                value: 0,
            });
        }
        if config.backoff_max_millis < config.backoff_base_millis {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "cache.backoff_max_millis".to_string(),
                value: config.backoff_max_millis,
            });
        }
        if !config.backoff_factor.is_finite() || config.backoff_factor < 1.0 {
            result.add_error(ConfigValidationError::InvalidBackoffFactor {
                value: config.backoff_factor,
            });
        }
        if config.max_retries > Self::MAX_RETRIES {
            result.add_error(ConfigValidationError::TooManyRetries {
                name: "cache.max_retries".to_string(),
                value: config.max_retries,
                maximum: Self::MAX_RETRIES,
            });
        }
        if config.attempt_timeout_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "cache.attempt_timeout_secs".to_string(),
                value: 0,
            });
        }

        for (token, value) in &config.overrides {
            if token.parse::<DataKind>().is_err() {
                result.add_error(ConfigValidationError::UnknownDataKind {
                    value: token.clone(),
                });
                continue;
            }
            Self::validate_override(token, value, result);
        }
    }

    fn validate_override(token: &str, value: &CacheOverride, result: &mut ValidationResult) {
        if value.ttl_minutes == Some(0) {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: format!("cache.overrides.{}.ttl_minutes", token),
                value: 0,
            });
        }
        if let Some(max_retries) = value.max_retries {
            if max_retries > Self::MAX_RETRIES {
                result.add_error(ConfigValidationError::TooManyRetries {
                    name: format!("cache.overrides.{}.max_retries", token),
                    value: max_retries,
                    maximum: Self::MAX_RETRIES,
                });
            }
        }
    }

    fn validate_upstream(config: &crate::UpstreamConfig, result: &mut ValidationResult) {
        match Url::parse(&config.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(_) => result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "upstream".to_string(),
                message: "URL must use http or https".to_string(),
            }),
            Err(e) => result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "upstream".to_string(),
                message: format!("Invalid URL format: {}", e),
            }),
        }

        if config.timeout_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "upstream.timeout_secs".to_string(),
                value: 0,
            });
        }

        if config.rate_limit_per_minute == 0 {
            result.add_error(ConfigValidationError::ZeroRateLimit);
        }
    }

    fn validate_observability(config: &crate::ObservabilityConfig, result: &mut ValidationResult) {
        let level = config.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ConfigValidationError::InvalidLogLevel {
                value: config.log_level.clone(),
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
