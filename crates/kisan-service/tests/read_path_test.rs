//! End-to-end read path behaviour over in-memory tiers.

mod common;

use common::{harness, harness_with_policy, start, ScriptedUpstream};
use kisan_config::CachePolicy;
use kisan_core::{CacheKey, CacheTier, DataKind, ErrorClass, KisanError, UpstreamError};
use kisan_repository::DurableCache;
use kisan_service::FastCache;
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;

fn pune() -> CacheKey {
    CacheKey::from_parts(DataKind::SevenDayForecast, "Pune", "Maharashtra").unwrap()
}

fn unwrap_no_fallback(err: KisanError) -> kisan_core::NoFallbackAvailable {
    match err {
        KisanError::NoFallbackAvailable(e) => e,
        other => panic!("expected NoFallbackAvailable, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_fast_hit_returns_original_fetch_time() {
    let h = harness(ScriptedUpstream::new([]));
    let fifteen_minutes_ago = start() - chrono::Duration::minutes(15);
    h.fast
        .set_entry(&pune(), "{\"days\":7}", fifteen_minutes_ago, Duration::from_secs(15 * 60))
        .await
        .unwrap();

    let response = h.orchestrator.get("Pune", "Maharashtra").await.unwrap();

    assert_eq!(response.tier, CacheTier::Fast);
    assert_eq!(response.payload, json!({"days": 7}));
    assert_eq!(response.fetched_at, fifteen_minutes_ago);
    assert_eq!(response.age(start()), chrono::Duration::minutes(15));
    assert_eq!(h.upstream.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_without_fallback_fail_after_four_attempts() {
    let h = harness(ScriptedUpstream::new([
        Err(UpstreamError::transient("503 Service Unavailable")),
        Err(UpstreamError::transient("connection reset")),
        Err(UpstreamError::transient("502 Bad Gateway")),
        Err(UpstreamError::transient("504 Gateway Timeout")),
        Ok(json!({"never": "reached"})),
    ]));
    let started = Instant::now();

    let err = h.orchestrator.get("Pune", "Maharashtra").await.unwrap_err();

    assert_eq!(err.status_code(), 503);
    let err = unwrap_no_fallback(err);
    assert_eq!(err.attempts, 4);
    assert_eq!(err.last_error_class, ErrorClass::Transient);
    assert_eq!(err.last_error, "504 Gateway Timeout");
    assert_eq!(err.kind, DataKind::SevenDayForecast);
    assert_eq!(err.location.district(), "pune");
    assert_eq!(h.upstream.calls(), 4);
    assert_eq!(started.elapsed(), Duration::from_secs(7));

    let message = err.to_string();
    assert!(message.contains("Pune, Maharashtra"));
    assert!(message.contains("7-day forecast"));
    assert!(!message.contains("504"));
}

#[tokio::test(start_paused = true)]
async fn test_success_on_third_attempt_updates_both_tiers() {
    let h = harness(ScriptedUpstream::new([
        Err(UpstreamError::transient("503 Service Unavailable")),
        Err(UpstreamError::transient("503 Service Unavailable")),
        Ok(json!({"days": [31, 32, 30]})),
    ]));
    let after_backoff = start() + chrono::Duration::seconds(3);
    let clock = h.clock.clone();
    clock.set(after_backoff);

    let response = h.orchestrator.get("Pune", "Maharashtra").await.unwrap();

    assert_eq!(response.tier, CacheTier::Upstream);
    assert!(!response.served_from_fallback);
    assert_eq!(response.fetched_at, after_backoff);
    assert_eq!(h.upstream.calls(), 3);

    let fast = h.fast.get_entry(&pune()).await.unwrap().unwrap();
    assert_eq!(fast.fetched_at, after_backoff);
    assert_eq!(serde_json::from_str::<serde_json::Value>(&fast.payload).unwrap(), response.payload);

    let durable = h.durable.get(&pune()).await.unwrap().unwrap();
    assert_eq!(durable.fetched_at, after_backoff);
    assert_eq!(durable.payload, fast.payload);
}

#[tokio::test(start_paused = true)]
async fn test_permanent_failure_serves_durable_with_original_timestamp() {
    let h = harness(ScriptedUpstream::new([Err(UpstreamError::permanent("400 Bad Request"))]));
    let two_hours_ago = start() - chrono::Duration::hours(2);
    h.durable
        .upsert(&pune(), "{\"days\":7}", two_hours_ago)
        .await
        .unwrap();
    let started = Instant::now();

    let response = h.orchestrator.get("Pune", "Maharashtra").await.unwrap();

    assert_eq!(response.tier, CacheTier::Durable);
    assert!(response.served_from_fallback);
    assert_eq!(response.fetched_at, two_hours_ago);
    assert_eq!(h.upstream.calls(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
    // a fallback read does not repopulate the fast tier
    assert!(!h.orchestrator.is_valid("Pune", "Maharashtra").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_fall_back_to_durable() {
    let h = harness(ScriptedUpstream::new([]));
    let yesterday = start() - chrono::Duration::days(1);
    h.durable.upsert(&pune(), "[]", yesterday).await.unwrap();

    let response = h.orchestrator.get("pune", "maharashtra").await.unwrap();

    assert!(response.served_from_fallback);
    assert_eq!(response.fetched_at, yesterday);
    assert_eq!(h.upstream.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_time_survives_every_tier() {
    let h = harness(ScriptedUpstream::new([
        Ok(json!({"v": 1})),
        Err(UpstreamError::permanent("404 Not Found")),
    ]));

    let fresh = h.orchestrator.get("Pune", "Maharashtra").await.unwrap();
    assert_eq!(fresh.fetched_at, start());

    h.clock.advance(Duration::from_secs(10 * 60));
    let cached = h.orchestrator.get("Pune", "Maharashtra").await.unwrap();
    assert_eq!(cached.tier, CacheTier::Fast);
    assert_eq!(cached.fetched_at, start());

    h.orchestrator.invalidate("Pune", "Maharashtra").await.unwrap();
    h.clock.advance(Duration::from_secs(10 * 60));
    let fallback = h.orchestrator.get("Pune", "Maharashtra").await.unwrap();
    assert_eq!(fallback.tier, CacheTier::Durable);
    assert_eq!(fallback.fetched_at, start());
}

#[tokio::test(start_paused = true)]
async fn test_retry_delays_follow_configured_schedule() {
    let policy = CachePolicy {
        max_retries: 4,
        backoff_base: Duration::from_millis(500),
        backoff_factor: 3.0,
        backoff_max: Duration::from_secs(5),
        ..CachePolicy::default()
    };
    let h = harness_with_policy(ScriptedUpstream::new([]), policy);

    let err = unwrap_no_fallback(h.orchestrator.get("Pune", "Maharashtra").await.unwrap_err());

    assert_eq!(err.attempts, 5);
    assert_eq!(
        h.upstream.gaps(),
        vec![
            Duration::from_millis(500),
            Duration::from_millis(1500),
            Duration::from_millis(4500),
            Duration::from_secs(5),
        ]
    );
    let gaps = h.upstream.gaps();
    assert!(gaps.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test(start_paused = true)]
async fn test_expired_entry_goes_back_upstream() {
    let h = harness(ScriptedUpstream::new([Ok(json!(1)), Ok(json!(2))]));

    h.orchestrator.get("Pune", "Maharashtra").await.unwrap();
    tokio::time::advance(Duration::from_secs(30 * 60)).await;
    h.clock.advance(Duration::from_secs(30 * 60));

    let response = h.orchestrator.get("Pune", "Maharashtra").await.unwrap();
    assert_eq!(response.tier, CacheTier::Upstream);
    assert_eq!(response.payload, json!(2));
    assert_eq!(response.fetched_at, start() + chrono::Duration::minutes(30));
    assert_eq!(h.upstream.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_payload_and_timestamp_expire_in_lockstep() {
    let h = harness(ScriptedUpstream::new([Ok(json!({"v": 1}))]));
    h.orchestrator.get("Pune", "Maharashtra").await.unwrap();

    tokio::time::advance(Duration::from_secs(30 * 60 - 1)).await;
    assert!(h.fast.exists(&pune()).await.unwrap());
    assert_eq!(h.fast.cached_at(&pune()).await.unwrap(), Some(start()));

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(!h.fast.exists(&pune()).await.unwrap());
    assert!(h.fast.cached_at(&pune()).await.unwrap().is_none());
    assert!(h.fast.get_entry(&pune()).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_half_written_pairs() {
    let h = harness(ScriptedUpstream::new([]));
    let invalidator = h.orchestrator.invalidator().clone();
    let fast = h.fast.clone();

    let writer = tokio::spawn(async move {
        for i in 0..500_i64 {
            let fetched_at = start() + chrono::Duration::seconds(i);
            invalidator
                .write(&pune(), &fetched_at.timestamp().to_string(), fetched_at)
                .await;
            tokio::task::yield_now().await;
        }
    });

    let mut readers = Vec::new();
    for _ in 0..4 {
        let fast = fast.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..500 {
                if let Some(entry) = fast.get_entry(&pune()).await.unwrap() {
                    assert_eq!(entry.payload, entry.fetched_at.timestamp().to_string());
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_misses_share_one_fetch() {
    let h = harness(
        ScriptedUpstream::new([Ok(json!({"days": 7}))]).with_latency(Duration::from_secs(2)),
    );

    let reads = (0..8).map(|_| h.orchestrator.get("Pune", "Maharashtra"));
    let responses = futures::future::join_all(reads).await;

    assert_eq!(h.upstream.calls(), 1);
    for response in responses {
        let response = response.unwrap();
        assert_eq!(response.tier, CacheTier::Upstream);
        assert_eq!(response.fetched_at, start());
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_misses_share_one_failure() {
    let h = harness(
        ScriptedUpstream::new([Err(UpstreamError::permanent("400 Bad Request"))])
            .with_latency(Duration::from_secs(1)),
    );

    let reads = (0..4).map(|_| h.orchestrator.get("Pune", "Maharashtra"));
    let results = futures::future::join_all(reads).await;

    assert_eq!(h.upstream.calls(), 1);
    for result in results {
        let err = unwrap_no_fallback(result.unwrap_err());
        assert_eq!(err.attempts, 1);
        assert_eq!(err.last_error_class, ErrorClass::Permanent);
    }
}

#[tokio::test(start_paused = true)]
async fn test_without_single_flight_each_miss_fetches() {
    let policy = CachePolicy {
        single_flight: false,
        ..CachePolicy::default()
    };
    let h = harness_with_policy(
        ScriptedUpstream::new([Ok(json!(1)), Ok(json!(1)), Ok(json!(1))])
            .with_latency(Duration::from_secs(1)),
        policy,
    );

    let reads = (0..3).map(|_| h.orchestrator.get("Pune", "Maharashtra"));
    for result in futures::future::join_all(reads).await {
        assert!(result.is_ok());
    }
    assert_eq!(h.upstream.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_reader_still_populates_cache() {
    let h = harness(ScriptedUpstream::new([Ok(json!({"v": 1}))]).with_latency(Duration::from_secs(5)));

    let read = h.orchestrator.get("Pune", "Maharashtra");
    assert!(tokio::time::timeout(Duration::from_secs(1), read).await.is_err());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(h.orchestrator.is_valid("Pune", "Maharashtra").await.unwrap());
    assert!(h.durable.get(&pune()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_is_valid_never_fetches() {
    let h = harness(ScriptedUpstream::new([Ok(json!(1))]));
    assert!(!h.orchestrator.is_valid("Pune", "Maharashtra").await.unwrap());
    assert_eq!(h.upstream.calls(), 0);
}
