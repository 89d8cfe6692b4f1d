//! Application state for Axum handlers.

use kisan_service::WeatherDataService;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub weather_service: Arc<WeatherDataService>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(weather_service: Arc<WeatherDataService>) -> Self {
        Self {
            weather_service,
            metrics: None,
        }
    }

    /// Attaches the Prometheus handle rendered at the metrics endpoint.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
