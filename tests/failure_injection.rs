//! Failure injection tests for the gateway, over real HTTP.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use adaptive_gateway::config::{CircuitBreakerConfig, RetryConfig, RouteConfig};
use adaptive_gateway::resilience::CircuitState;
use gateway_sdk::{Registration, RegistryClient};
use serde_json::Value;

mod common;

fn counting_backend(
    calls: Arc<AtomicU32>,
    plan: fn(u32) -> u16,
) -> impl Fn() -> std::pin::Pin<Box<dyn std::future::Future<Output = (u16, String)> + Send>> + Send + Sync + 'static
{
    move || {
        let calls = calls.clone();
        Box::pin(async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            let status = plan(n);
            (status, format!("status {}", status))
        })
    }
}

#[tokio::test]
async fn test_retry_on_failure() {
    let calls = Arc::new(AtomicU32::new(0));
    let backend = common::start_programmable_backend(counting_backend(calls.clone(), |n| {
        if n < 2 {
            503
        } else {
            200
        }
    }))
    .await;

    let route = RouteConfig::new("/*", "web", &["GET"]).with_retry(RetryConfig {
        max_attempts: 3,
        initial_delay_ms: 50,
        max_delay_ms: 500,
        backoff_multiplier: 2.0,
        retryable_status_codes: Some(vec![502, 503]),
        jitter: false,
    });
    let gw = common::start_gateway(vec![route]).await;
    gw.register("web", backend);

    let res = common::client().get(gw.url("/hello")).send().await.unwrap();
    assert_eq!(res.status(), 200, "should succeed after retries");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let metrics = gw.gateway.get_metrics();
    assert_eq!(metrics.successful_requests, 1);
    assert_eq!(metrics.retry_attempts, 2);
    gw.shutdown.trigger();
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let backend = common::start_programmable_backend(counting_backend(calls.clone(), |_| 404)).await;

    let route = RouteConfig::new("/*", "web", &["GET"]).with_retry(RetryConfig {
        initial_delay_ms: 10,
        ..RetryConfig::default()
    });
    let gw = common::start_gateway(vec![route]).await;
    gw.register("web", backend);

    let res = common::client().get(gw.url("/missing")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.text().await.unwrap(), "status 404");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    gw.shutdown.trigger();
}

#[tokio::test]
async fn test_circuit_breaker_opens() {
    let calls = Arc::new(AtomicU32::new(0));
    let backend = common::start_programmable_backend(counting_backend(calls.clone(), |_| 500)).await;

    let route = RouteConfig::new("/*", "flaky", &["GET"]).with_circuit_breaker(CircuitBreakerConfig {
        failure_threshold: 2,
        reset_timeout_ms: 60_000,
        half_open_requests: 1,
    });
    let gw = common::start_gateway(vec![route]).await;
    gw.register("flaky", backend);
    let client = common::client();

    for _ in 0..2 {
        let res = client.get(gw.url("/x")).send().await.unwrap();
        assert_eq!(res.status(), 500);
    }

    let res = client.get(gw.url("/x")).send().await.unwrap();
    assert_eq!(res.status(), 503);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "circuit_open");
    assert_eq!(calls.load(Ordering::SeqCst), 2, "open breaker must not reach the backend");

    let stats = gw.gateway.breaker_stats("flaky").unwrap();
    assert_eq!(stats.state, CircuitState::Open);
    assert_eq!(stats.trips, 1);
    gw.shutdown.trigger();
}

#[tokio::test]
async fn test_breaker_recovers_through_half_open() {
    let calls = Arc::new(AtomicU32::new(0));
    let backend =
        common::start_programmable_backend(counting_backend(calls.clone(), |n| if n < 1 { 502 } else { 200 }))
            .await;

    let route = RouteConfig::new("/*", "svc", &["GET"]).with_circuit_breaker(CircuitBreakerConfig {
        failure_threshold: 1,
        reset_timeout_ms: 100,
        half_open_requests: 1,
    });
    let gw = common::start_gateway(vec![route]).await;
    gw.register("svc", backend);
    let client = common::client();

    assert_eq!(client.get(gw.url("/")).send().await.unwrap().status(), 502);
    assert_eq!(client.get(gw.url("/")).send().await.unwrap().status(), 503);

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(gw.gateway.breaker_stats("svc").unwrap().state, CircuitState::HalfOpen);

    assert_eq!(client.get(gw.url("/")).send().await.unwrap().status(), 200);
    assert_eq!(gw.gateway.breaker_stats("svc").unwrap().state, CircuitState::Closed);
    gw.shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_backend_is_bad_gateway() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    let gw = common::start_gateway(vec![RouteConfig::new("/*", "gone", &["GET"])]).await;
    gw.register("gone", dead);

    let res = common::client().get(gw.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 502);
    gw.shutdown.trigger();
}

#[tokio::test]
async fn test_sdk_registration_round_trip() {
    let backend = common::start_mock_backend("from sdk instance").await;
    let gw = common::start_gateway(vec![RouteConfig::new("/orders/*", "orders", &["GET"])]).await;
    let client = common::client();

    let sdk = RegistryClient::new(&gw.admin_url(), common::ADMIN_KEY);
    let registration = Registration::new("orders", backend.ip().to_string(), backend.port())
        .with_metadata("zone", "test");
    let id = sdk.register(&registration).await.unwrap();
    sdk.heartbeat(&id).await.unwrap();

    let res = client.get(gw.url("/orders/1")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "from sdk instance");

    let instance = gw.gateway.registry().get(&id).unwrap();
    assert_eq!(instance.metadata.get("zone").map(String::as_str), Some("test"));

    sdk.unregister(&id).await.unwrap();
    assert!(sdk.heartbeat(&id).await.is_err());

    let res = client.get(gw.url("/orders/1")).send().await.unwrap();
    assert_eq!(res.status(), 503);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "no_instances_available");

    let bad = RegistryClient::new(&gw.admin_url(), "wrong-key");
    assert!(bad.register(&registration).await.is_err());
    gw.shutdown.trigger();
}

#[tokio::test]
async fn test_sdk_heartbeat_reregisters_lost_instance() {
    let backend = common::start_mock_backend("ok").await;
    let gw = common::start_gateway(vec![]).await;

    let sdk = RegistryClient::new(&gw.admin_url(), common::ADMIN_KEY);
    let registration = Registration::new("users", backend.ip().to_string(), backend.port());
    let id = sdk.register(&registration).await.unwrap();

    assert!(gw.gateway.registry().unregister(&id));
    let task = sdk.spawn_heartbeat(registration, id.clone(), Duration::from_millis(30));
    tokio::time::sleep(Duration::from_millis(150)).await;
    task.abort();

    assert!(gw.gateway.registry().get(&id).is_some());
    gw.shutdown.trigger();
}
