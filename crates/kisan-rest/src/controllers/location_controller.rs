//! Location-wide cache management.

use crate::responses::{no_content, AppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::delete,
    Router,
};

/// Creates the locations router.
pub fn router() -> Router<AppState> {
    Router::new().route("/:state/:district/cache", delete(invalidate_location))
}

/// Drops the fast cache entries of every kind for one location.
pub async fn invalidate_location(
    State(state): State<AppState>,
    Path((state_name, district)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state
        .weather_service
        .invalidate_location(&district, &state_name)
        .await?;
    Ok(no_content())
}
