//! Server startup utilities.

use kisan_config::AppConfig;
use tracing::info;

/// Prints server startup information.
pub fn print_startup_info(config: &AppConfig) {
    let separator = "=".repeat(60);
    let addr = config.server.addr();
    info!("{}", separator);
    info!("REST API:  http://{}/api/v1/weather", addr);
    info!("Health:    http://{}/health", addr);
    if config.observability.metrics_enabled {
        info!("Metrics:   http://{}{}", addr, config.observability.metrics_path);
    }
    info!(
        "Cache:     ttl={}m retries={} single_flight={}",
        config.cache.ttl_minutes, config.cache.max_retries, config.cache.single_flight
    );
    info!("{}", separator);
}
