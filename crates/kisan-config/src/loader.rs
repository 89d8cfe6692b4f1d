//! Configuration loader with layered sources.

use crate::{format_validation_errors, AppConfig, ConfigValidator};
use config::{Config, ConfigError, Environment, File};
use kisan_core::KisanError;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Environment variable selecting the environment-specific config file.
pub const ENVIRONMENT_VAR: &str = "KISAN_ENVIRONMENT";

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<AppConfig>>,
    config_dir: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides
    /// 4. Environment variables with `KISAN__` prefix
    pub fn new(config_dir: impl Into<String>) -> Result<Self, KisanError> {
        let config_dir = config_dir.into();
        let config = Self::load_config(&config_dir)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, KisanError> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk.
    ///
    /// The previous configuration is kept when the new one fails validation.
    pub async fn reload(&self) -> Result<(), KisanError> {
        let new_config = Self::load_config(&self.config_dir)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    fn load_config(config_dir: &str) -> Result<AppConfig, KisanError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| "development".to_string());

        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        for name in ["default", environment.as_str(), "local"] {
            let path = format!("{}/{}.toml", config_dir, name);
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path);
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("KISAN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error_to_kisan_error)?;

        let mut app_config: AppConfig = config
            .try_deserialize()
            .map_err(config_error_to_kisan_error)?;
        app_config.app.environment = environment;

        Self::validate_config(&app_config)?;

        Ok(app_config)
    }

    fn validate_config(config: &AppConfig) -> Result<(), KisanError> {
        ConfigValidator::validate(config)
            .map_err(|errors| KisanError::Configuration(format_validation_errors(&errors)))
    }
}

fn config_error_to_kisan_error(err: ConfigError) -> KisanError {
    KisanError::Configuration(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kisan_core::DataKind;
    use std::time::Duration;

    fn write_default(dir: &tempfile::TempDir, contents: &str) {
        std::fs::write(dir.path().join("default.toml"), contents).unwrap();
    }

    #[tokio::test]
    async fn test_loads_defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path().to_string_lossy()).unwrap();
        let config = loader.get().await;
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cache.ttl_minutes, 30);
        assert_eq!(config.upstream.rate_limit_per_minute, 60);
    }

    #[tokio::test]
    async fn test_loads_cache_section_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        write_default(
            &dir,
            r#"
[cache]
ttl_minutes = 15
max_retries = 2

[cache.overrides.ALERTS]
ttl_minutes = 5
"#,
        );

        let loader = ConfigLoader::new(dir.path().to_string_lossy()).unwrap();
        let config = loader.get().await;
        assert_eq!(config.cache.ttl_minutes, 15);

        let alerts = config.cache.for_kind(DataKind::SevereAlert);
        assert_eq!(alerts.ttl, Duration::from_secs(5 * 60));
        assert_eq!(alerts.max_retries, 2);
    }

    #[tokio::test]
    async fn test_invalid_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        write_default(&dir, "[cache]\nttl_minutes = 0\n");

        let err = ConfigLoader::new(dir.path().to_string_lossy()).err().unwrap();
        assert!(matches!(err, KisanError::Configuration(_)));
        assert!(err.to_string().contains("cache.ttl_minutes"));
    }

    #[tokio::test]
    async fn test_reload_picks_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        write_default(&dir, "[server]\nport = 9000\n");
        let loader = ConfigLoader::new(dir.path().to_string_lossy()).unwrap();
        assert_eq!(loader.get().await.server.port, 9000);

        write_default(&dir, "[server]\nport = 9100\n");
        loader.reload().await.unwrap();
        assert_eq!(loader.get().await.server.port, 9100);
    }
}
