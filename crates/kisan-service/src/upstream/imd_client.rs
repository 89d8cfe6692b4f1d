//! HTTP client for the IMD weather API.

use super::UpstreamClient;
use async_trait::async_trait;
use kisan_config::UpstreamConfig;
use kisan_core::{DataKind, KisanError, KisanResult, LocationKey, UpstreamError};
use kisan_resilience::RateLimiter;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::{debug, info};
use url::Url;

/// Weather API client with outbound rate limiting and failure classification.
#[derive(Debug, Clone)]
pub struct ImdHttpClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
    limiter: RateLimiter,
}

impl ImdHttpClient {
    /// Builds a client from configuration.
    pub fn new(config: &UpstreamConfig) -> KisanResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| KisanError::Configuration(format!("Invalid upstream URL: {}", e)))?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("kisan-weather-cache/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()
            .map_err(|e| KisanError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            base_url = %base_url,
            rate_limit_per_minute = config.rate_limit_per_minute,
            "Upstream client initialized"
        );

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            limiter: RateLimiter::per_minute(config.rate_limit_per_minute),
        })
    }

    /// Builds the request URL for one kind and location.
    fn url_for(&self, kind: DataKind, location: &LocationKey) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| UpstreamError::permanent(format!("Base URL cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(endpoint_segments(kind))
            .push(location.district());
        url.query_pairs_mut().append_pair("state", location.state());
        Ok(url)
    }
}

/// Path segments of the endpoint serving `kind`; the district is appended.
#[must_use]
pub const fn endpoint_segments(kind: DataKind) -> &'static [&'static str] {
    match kind {
        DataKind::SevenDayForecast => &["weather", "forecast", "7day"],
        DataKind::CurrentObservation => &["weather", "current"],
        DataKind::Nowcast => &["weather", "nowcast"],
        DataKind::SevereAlert => &["weather", "alerts"],
        DataKind::RainfallDeparture => &["weather", "rainfall"],
        DataKind::AgrometAdvisory => &["weather", "agromet"],
    }
}

/// Classifies a non-success HTTP status.
///
/// Rate limiting, request timeouts and server errors are transient;
/// every other status is permanent.
#[must_use]
pub fn classify_status(status: StatusCode) -> UpstreamError {
    let message = format!("Upstream returned {}", status);
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        UpstreamError::Transient(message)
    } else {
        UpstreamError::Permanent(message)
    }
}

fn classify_transport(err: &reqwest::Error) -> UpstreamError {
    if err.is_builder() {
        UpstreamError::Permanent(format!("Invalid upstream request: {}", err))
    } else {
        UpstreamError::Transient(format!("Upstream request failed: {}", err))
    }
}

#[async_trait]
impl<T> UpstreamClient<T> for ImdHttpClient
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch(&self, kind: DataKind, location: &LocationKey) -> Result<T, UpstreamError> {
        let url = self.url_for(kind, location)?;

        self.limiter.wait().await;

        debug!(kind = %kind, location = %location, url = %url, "Fetching from upstream");
        let started = Instant::now();

        let mut request = self.client.get(url).header("Accept", "application/json");
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let body = response.text().await.map_err(|e| classify_transport(&e))?;
        let payload = serde_json::from_str(&body)
            .map_err(|e| UpstreamError::Permanent(format!("Malformed upstream response: {}", e)))?;

        debug!(
            kind = %kind,
            location = %location,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upstream fetch succeeded"
        );
        Ok(payload)
    }
}
