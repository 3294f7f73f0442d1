//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Keep the gateway-wide aggregate behind a single `record` funnel
//! - Mirror every update to the `metrics` facade for Prometheus scraping
//!
//! # Metrics
//! - `gateway_requests_total` (counter): routed requests by service, outcome
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_retry_attempts_total` (counter): retries by service
//! - `gateway_circuit_breaker_trips_total` (counter): trips by service
//! - `gateway_circuit_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `gateway_service_healthy_instances` (gauge): healthy instances per service

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::load_balancer::stats::EMA_ALPHA;

/// What happened to one routed request.
#[derive(Debug, Clone)]
pub struct RequestOutcome<'a> {
    /// Target service, None when no route matched.
    pub service: Option<&'a str>,
    pub success: bool,
    pub elapsed: Duration,
    /// Attempts beyond the first.
    pub retries: u32,
}

#[derive(Debug, Default)]
struct MetricsState {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    avg_response_time_ms: Option<f64>,
    circuit_breaker_trips: u64,
    retry_attempts: u64,
}

/// Gateway-wide request aggregate.
#[derive(Debug)]
pub struct GatewayMetrics {
    started: Instant,
    state: Mutex<MetricsState>,
}

/// Point-in-time view of the aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub avg_response_time_ms: f64,
    pub requests_per_second: f64,
    pub circuit_breaker_trips: u64,
    pub retry_attempts: u64,
    pub uptime_secs: f64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            state: Mutex::new(MetricsState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Single entry point for request bookkeeping.
    pub fn record(&self, outcome: &RequestOutcome<'_>) {
        let elapsed_ms = outcome.elapsed.as_secs_f64() * 1000.0;
        {
            let mut state = self.lock();
            state.total_requests += 1;
            state.retry_attempts += u64::from(outcome.retries);
            if outcome.success {
                state.successful_requests += 1;
                state.avg_response_time_ms = Some(match state.avg_response_time_ms {
                    Some(previous) => EMA_ALPHA * elapsed_ms + (1.0 - EMA_ALPHA) * previous,
                    None => elapsed_ms,
                });
            } else {
                state.failed_requests += 1;
            }
        }

        let service = outcome.service.unwrap_or("none").to_string();
        let result = if outcome.success { "success" } else { "failure" };
        counter!("gateway_requests_total", "service" => service.clone(), "outcome" => result).increment(1);
        histogram!("gateway_request_duration_seconds", "service" => service.clone())
            .record(outcome.elapsed.as_secs_f64());
        if outcome.retries > 0 {
            counter!("gateway_retry_attempts_total", "service" => service)
                .increment(u64::from(outcome.retries));
        }
    }

    /// Count a CLOSED/HALF_OPEN → OPEN transition.
    pub fn record_trip(&self, service: &str) {
        self.lock().circuit_breaker_trips += 1;
        counter!("gateway_circuit_breaker_trips_total", "service" => service.to_string()).increment(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let uptime_secs = self.uptime().as_secs_f64();
        let state = self.lock();
        let requests_per_second = if uptime_secs > 0.0 {
            state.total_requests as f64 / uptime_secs
        } else {
            0.0
        };

        MetricsSnapshot {
            total_requests: state.total_requests,
            successful_requests: state.successful_requests,
            failed_requests: state.failed_requests,
            avg_response_time_ms: state.avg_response_time_ms.unwrap_or(0.0),
            requests_per_second,
            circuit_breaker_trips: state.circuit_breaker_trips,
            retry_attempts: state.retry_attempts,
            uptime_secs,
        }
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Publish the healthy instance count of a service.
pub fn record_service_health(service: &str, healthy_instances: usize) {
    gauge!("gateway_service_healthy_instances", "service" => service.to_string())
        .set(healthy_instances as f64);
}

/// Publish a breaker state (0=closed, 1=half-open, 2=open).
pub fn record_breaker_state(service: &str, state: u8) {
    gauge!("gateway_circuit_breaker_state", "service" => service.to_string()).set(f64::from(state));
}
