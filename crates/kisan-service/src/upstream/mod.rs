//! Upstream data sources.

mod imd_client;

pub use imd_client::{classify_status, endpoint_segments, ImdHttpClient};

use async_trait::async_trait;
use kisan_core::{DataKind, LocationKey, UpstreamError};

/// A remote source of perishable data.
///
/// Implementations only fetch and classify; they never touch a cache tier.
#[async_trait]
pub trait UpstreamClient<T>: Send + Sync {
    /// Fetches one payload for `kind` at `location`.
    async fn fetch(&self, kind: DataKind, location: &LocationKey) -> Result<T, UpstreamError>;
}
