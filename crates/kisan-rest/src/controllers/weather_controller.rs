//! Cached weather reads and per-key cache management.

use crate::responses::{cached, no_content, ok, ApiResult, AppError, CachedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use kisan_core::DataKind;
use kisan_service::CacheStatus;
use serde::Deserialize;
use serde_json::Value;

/// Path parameters identifying one cache key.
#[derive(Debug, Deserialize)]
pub struct WeatherPath {
    /// Kind token, e.g. `7DAY`.
    pub kind: String,
    pub state: String,
    pub district: String,
}

impl WeatherPath {
    fn kind(&self) -> Result<DataKind, AppError> {
        Ok(self.kind.parse()?)
    }
}

/// Creates the weather router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:kind/:state/:district", get(get_weather))
        .route(
            "/:kind/:state/:district/cache",
            get(cache_status).delete(invalidate),
        )
}

/// Reads one kind of weather data, falling back through the cache tiers.
pub async fn get_weather(
    State(state): State<AppState>,
    Path(path): Path<WeatherPath>,
) -> Result<CachedJson<Value>, AppError> {
    let response = state
        .weather_service
        .get(path.kind()?, &path.district, &path.state)
        .await?;
    cached(response)
}

/// Reports whether the fast cache holds the key. Never fetches.
pub async fn cache_status(
    State(state): State<AppState>,
    Path(path): Path<WeatherPath>,
) -> ApiResult<CacheStatus> {
    let status = state
        .weather_service
        .cache_status(path.kind()?, &path.district, &path.state)
        .await?;
    ok(status)
}

/// Drops the fast cache entry so the next read goes upstream.
pub async fn invalidate(
    State(state): State<AppState>,
    Path(path): Path<WeatherPath>,
) -> Result<StatusCode, AppError> {
    state
        .weather_service
        .invalidate(path.kind()?, &path.district, &path.state)
        .await?;
    Ok(no_content())
}
