//! End-to-end routing scenario against an in-process transport.

use async_trait::async_trait;
use axum::http::Method;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use adaptive_gateway::config::{CircuitBreakerConfig, RetryConfig, RouteConfig};
use adaptive_gateway::error::{DownstreamError, GatewayError};
use adaptive_gateway::gateway::{DownstreamResponse, GatewayRequest, GatewayRouter, Transport};
use adaptive_gateway::registry::{ServiceInstance, ServiceRegistry};
use adaptive_gateway::resilience::CircuitState;

/// Answers with the target address; addresses in `failing` answer 503.
#[derive(Default)]
struct EchoTransport {
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl EchoTransport {
    fn fail(&self, address: &str) {
        self.failing.lock().unwrap().insert(address.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(a, _)| a.clone()).collect()
    }

    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl Transport for EchoTransport {
    async fn call(
        &self,
        target: &ServiceInstance,
        _request: &GatewayRequest,
    ) -> Result<DownstreamResponse, DownstreamError> {
        let address = target.address();
        self.calls.lock().unwrap().push((address.clone(), Instant::now()));
        if self.failing.lock().unwrap().contains(&address) {
            return Err(DownstreamError::with_status(503, format!("{} unavailable", address)));
        }
        Ok(DownstreamResponse::ok(address))
    }
}

fn get(path: &str) -> GatewayRequest {
    GatewayRequest::new(Method::GET, path)
}

fn body(response: &DownstreamResponse) -> String {
    String::from_utf8(response.body.to_vec()).unwrap()
}

#[tokio::test]
async fn test_orders_scenario() {
    let registry = Arc::new(ServiceRegistry::new(Duration::from_millis(40)));
    let transport = Arc::new(EchoTransport::default());
    let gateway = GatewayRouter::new(registry.clone(), transport.clone());

    gateway
        .add_route(
            RouteConfig::new("/api/orders/*", "orders", &["GET", "POST"]).with_circuit_breaker(
                CircuitBreakerConfig {
                    failure_threshold: 2,
                    reset_timeout_ms: 60_000,
                    half_open_requests: 1,
                },
            ),
        )
        .unwrap();

    let a = registry.register_service("orders", "10.0.0.1", 9001, HashMap::new());
    let b = registry.register_service("orders", "10.0.0.2", 9002, HashMap::new());

    // Round-robin: A, B, A
    let mut seen = Vec::new();
    for _ in 0..3 {
        seen.push(body(&gateway.route(&get("/api/orders/1")).await.unwrap()));
    }
    assert_eq!(seen, vec!["10.0.0.1:9001", "10.0.0.2:9002", "10.0.0.1:9001"]);
    assert!(gateway.get_health().is_up("orders"));

    // A goes stale, B keeps heartbeating
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(registry.update_heartbeat(&b));
    let flipped = registry.sweep();
    assert_eq!(flipped, vec![a.clone()]);

    let healthy = registry.get_services_by_name("orders");
    assert_eq!(healthy.len(), 1);
    assert_eq!(healthy[0].id, b);

    // Two failed calls to B trip the breaker
    transport.fail("10.0.0.2:9002");
    for _ in 0..2 {
        let err = gateway.route(&get("/api/orders/1")).await.unwrap_err();
        assert_eq!(err.status_code(), Some(503));
    }
    assert_eq!(gateway.breaker_stats("orders").unwrap().state, CircuitState::Open);

    let before = transport.calls().len();
    let err = gateway.route(&get("/api/orders/1")).await.unwrap_err();
    assert_eq!(err, GatewayError::CircuitOpen("orders".into()));
    assert_eq!(transport.calls().len(), before, "transport must not be called");

    let health = gateway.get_health();
    assert!(health.is_up("orders"));
    assert_eq!(health.circuit_breakers[0].state, CircuitState::Open);

    let metrics = gateway.get_metrics();
    assert_eq!(metrics.total_requests, 6);
    assert_eq!(metrics.successful_requests, 3);
    assert_eq!(metrics.failed_requests, 3);
    assert_eq!(metrics.circuit_breaker_trips, 1);
}

#[tokio::test]
async fn test_retry_reselects_instance_each_attempt() {
    let registry = Arc::new(ServiceRegistry::new(Duration::from_secs(10)));
    let transport = Arc::new(EchoTransport::default());
    let gateway = GatewayRouter::new(registry.clone(), transport.clone());

    gateway
        .add_route(RouteConfig::new("/users/*", "users", &["GET"]).with_retry(RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            backoff_multiplier: 2.0,
            retryable_status_codes: None,
            jitter: false,
        }))
        .unwrap();

    registry.register_service("users", "10.0.1.1", 8000, HashMap::new());
    registry.register_service("users", "10.0.1.2", 8000, HashMap::new());
    transport.fail("10.0.1.1:8000");

    let response = gateway.route(&get("/users/7")).await.unwrap();
    assert_eq!(body(&response), "10.0.1.2:8000");
    assert_eq!(transport.calls(), vec!["10.0.1.1:8000", "10.0.1.2:8000"]);
    assert_eq!(gateway.get_metrics().retry_attempts, 1);
}

#[tokio::test]
async fn test_retries_exhausted_with_backoff() {
    let registry = Arc::new(ServiceRegistry::new(Duration::from_secs(10)));
    let transport = Arc::new(EchoTransport::default());
    let gateway = GatewayRouter::new(registry.clone(), transport.clone());

    gateway
        .add_route(RouteConfig::new("/pay", "payments", &["POST"]).with_retry(RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            backoff_multiplier: 2.0,
            retryable_status_codes: Some(vec![503]),
            jitter: false,
        }))
        .unwrap();
    registry.register_service("payments", "10.0.2.1", 7000, HashMap::new());
    transport.fail("10.0.2.1:7000");

    let started = Instant::now();
    let err = gateway
        .route(&GatewayRequest::new(Method::POST, "/pay").with_body("{}"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(503));

    let times = transport.call_times();
    assert_eq!(times.len(), 3);
    let first_gap = times[1] - times[0];
    let second_gap = times[2] - times[1];
    assert!(first_gap >= Duration::from_millis(100) && first_gap < Duration::from_millis(180));
    assert!(second_gap >= Duration::from_millis(200) && second_gap < Duration::from_millis(280));
    assert!(started.elapsed() < Duration::from_millis(600), "no sleep after the final attempt");
}

#[tokio::test]
async fn test_replace_routes_is_atomic() {
    let registry = Arc::new(ServiceRegistry::new(Duration::from_secs(10)));
    let gateway = GatewayRouter::new(registry, Arc::new(EchoTransport::default()));
    gateway.add_route(RouteConfig::new("/old", "old", &["GET"])).unwrap();

    let err = gateway
        .replace_routes(vec![
            RouteConfig::new("/new", "new", &["GET"]),
            RouteConfig::new("/bad/*/path", "bad", &["GET"]),
        ])
        .unwrap_err();
    assert!(matches!(err, GatewayError::InvalidRoute(_)));
    assert_eq!(gateway.get_routes()[0].path, "/old");

    gateway
        .replace_routes(vec![RouteConfig::new("/new", "new", &["GET"])])
        .unwrap();
    let paths: Vec<String> = gateway.get_routes().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/new"]);
}
