//! Prometheus metrics for the cache read path.

use ::metrics::{counter, describe_counter, describe_histogram, histogram};
use kisan_core::{CacheTier, DataKind};
use std::time::Duration;

/// Metric names for the cache subsystem.
pub mod names {
    /// Reads answered by the fast cache.
    pub const FAST_HITS_TOTAL: &str = "kisan_cache_fast_hits_total";
    /// Reads that missed the fast cache.
    pub const FAST_MISSES_TOTAL: &str = "kisan_cache_fast_misses_total";
    /// Reads answered by the durable fallback.
    pub const DURABLE_FALLBACKS_TOTAL: &str = "kisan_cache_durable_fallbacks_total";
    /// Reads that failed with no fallback.
    pub const NO_FALLBACK_TOTAL: &str = "kisan_cache_no_fallback_total";
    /// Individual upstream invocations.
    pub const UPSTREAM_ATTEMPTS_TOTAL: &str = "kisan_upstream_attempts_total";
    /// Upstream fetch duration, including retries.
    pub const UPSTREAM_FETCH_SECONDS: &str = "kisan_upstream_fetch_duration_seconds";
    /// Best-effort tier writes that failed.
    pub const WRITE_FAILURES_TOTAL: &str = "kisan_cache_write_failures_total";
    /// Reads that joined an in-flight fetch.
    pub const COALESCED_TOTAL: &str = "kisan_cache_coalesced_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::FAST_HITS_TOTAL, "Reads answered by the fast cache");
    describe_counter!(names::FAST_MISSES_TOTAL, "Reads that missed the fast cache");
    describe_counter!(
        names::DURABLE_FALLBACKS_TOTAL,
        "Reads answered by the durable cache after an upstream failure"
    );
    describe_counter!(
        names::NO_FALLBACK_TOTAL,
        "Reads that failed because neither upstream nor the durable cache could answer"
    );
    describe_counter!(names::UPSTREAM_ATTEMPTS_TOTAL, "Upstream invocations, including retries");
    describe_histogram!(
        names::UPSTREAM_FETCH_SECONDS,
        "Upstream fetch duration in seconds, including retry delays"
    );
    describe_counter!(names::WRITE_FAILURES_TOTAL, "Best-effort cache writes that failed");
    describe_counter!(names::COALESCED_TOTAL, "Reads that joined an in-flight upstream fetch");
}

/// Cache metrics recorder.
#[derive(Debug, Clone, Copy)]
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a fast cache hit.
    pub fn fast_hit(kind: DataKind) {
        counter!(names::FAST_HITS_TOTAL, "kind" => kind.token()).increment(1);
    }

    /// Record a fast cache miss.
    pub fn fast_miss(kind: DataKind) {
        counter!(names::FAST_MISSES_TOTAL, "kind" => kind.token()).increment(1);
    }

    /// Record a durable fallback.
    pub fn durable_fallback(kind: DataKind) {
        counter!(names::DURABLE_FALLBACKS_TOTAL, "kind" => kind.token()).increment(1);
    }

    /// Record a read that failed with no fallback.
    pub fn no_fallback(kind: DataKind) {
        counter!(names::NO_FALLBACK_TOTAL, "kind" => kind.token()).increment(1);
    }

    /// Record one upstream invocation.
    pub fn upstream_attempt(kind: DataKind) {
        counter!(names::UPSTREAM_ATTEMPTS_TOTAL, "kind" => kind.token()).increment(1);
    }

    /// Record a finished upstream fetch.
    pub fn upstream_fetch(kind: DataKind, duration: Duration, success: bool) {
        histogram!(
            names::UPSTREAM_FETCH_SECONDS,
            "kind" => kind.token(),
            "status" => if success { "success" } else { "failure" }
        )
        .record(duration.as_secs_f64());
    }

    /// Record a failed best-effort write.
    pub fn write_failure(kind: DataKind, tier: CacheTier) {
        counter!(
            names::WRITE_FAILURES_TOTAL,
            "kind" => kind.token(),
            "tier" => tier.as_str()
        )
        .increment(1);
    }

    /// Record a read that joined an in-flight fetch.
    pub fn coalesced(kind: DataKind) {
        counter!(names::COALESCED_TOTAL, "kind" => kind.token()).increment(1);
    }
}
