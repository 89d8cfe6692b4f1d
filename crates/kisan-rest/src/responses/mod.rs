//! Response envelope and error mapping for the weather cache API.
//!
//! Successful reads are wrapped as `{ success: true, data }`. Failures are
//! wrapped as `{ success: false, error: { code, message } }` where the message
//! is safe to show to an end user. When no tier can serve a read the response
//! is a 503 carrying `Retry-After`.

use axum::{
    http::{
        header::{HeaderName, RETRY_AFTER},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use kisan_core::{CacheTier, CachedResponse, ErrorResponse, KisanError};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Header naming the tier a weather payload was served from.
pub const CACHE_TIER_HEADER: HeaderName = HeaderName::from_static("x-cache-tier");

/// Seconds a client is asked to wait after a read found no data anywhere.
pub const NO_DATA_RETRY_AFTER_SECS: u64 = 60;

/// Standard API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(error: ErrorResponse) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Handler error. Maps [`KisanError`] onto a status code and envelope.
#[derive(Debug)]
pub struct AppError(pub KisanError);

impl From<KisanError> for AppError {
    fn from(err: KisanError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match &self.0 {
            KisanError::NoFallbackAvailable(e) => warn!(
                kind = %e.kind,
                location = %e.location,
                attempts = e.attempts,
                class = ?e.last_error_class,
                last_error = %e.last_error,
                "No tier could serve the read"
            ),
            other if status.is_server_error() => {
                error!(code = other.error_code(), error = ?other, "Request failed");
            }
            _ => {}
        }

        let body = Json(ApiResponse::failure(ErrorResponse::from_error(&self.0)));
        let mut response = (status, body).into_response();
        if matches!(self.0, KisanError::NoFallbackAvailable(_)) {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(NO_DATA_RETRY_AFTER_SECS));
        }
        response
    }
}

/// A weather read, rendered in the envelope with its serving tier as a header.
#[derive(Debug)]
pub struct CachedJson<T>(pub CachedResponse<T>);

impl<T: Serialize> IntoResponse for CachedJson<T> {
    fn into_response(self) -> Response {
        let tier: CacheTier = self.0.tier;
        let mut response = Json(ApiResponse::success(self.0)).into_response();
        response
            .headers_mut()
            .insert(CACHE_TIER_HEADER, HeaderValue::from_static(tier.as_str()));
        response
    }
}

/// Result type for Axum handlers.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

pub fn cached<T: Serialize>(response: CachedResponse<T>) -> Result<CachedJson<T>, AppError> {
    Ok(CachedJson(response))
}

pub fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}
