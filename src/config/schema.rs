//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits; routes are also accepted as JSON by the admin API.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::load_balancer::Algorithm;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Front listener configuration.
    pub listener: ListenerConfig,

    /// Service registry settings.
    pub registry: RegistryConfig,

    /// Outbound transport settings.
    pub transport: TransportConfig,

    /// Route definitions, matched in order.
    pub routes: Vec<RouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Whole-request timeout for inbound requests in seconds.
    pub request_timeout_secs: u64,

    /// Maximum inbound body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 60,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Service registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Expected heartbeat period; instances silent for twice this are unhealthy.
    pub heartbeat_interval_ms: u64,
}

impl RegistryConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 10_000,
        }
    }
}

/// Outbound transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Maximum downstream response body size in bytes.
    pub max_response_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 2_000,
            max_response_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Route configuration mapping requests to a logical service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouteConfig {
    /// Path pattern; a single trailing `*` matches any suffix.
    pub path: String,

    /// Logical service name to forward to.
    pub service: String,

    /// Allowed HTTP methods.
    pub methods: Vec<String>,

    /// Load balancing settings (default: round-robin).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer: Option<LoadBalancerConfig>,

    /// Circuit breaker settings; calls go unprotected when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_breaker: Option<CircuitBreakerConfig>,

    /// Retry settings; a single attempt when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,

    /// Per-attempt downstream timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl RouteConfig {
    /// Create a route with no resilience settings.
    pub fn new(path: impl Into<String>, service: impl Into<String>, methods: &[&str]) -> Self {
        Self {
            path: path.into(),
            service: service.into(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            load_balancer: None,
            circuit_breaker: None,
            retry: None,
            timeout_ms: None,
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.load_balancer = Some(LoadBalancerConfig { algorithm });
        self
    }

    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = Some(config);
        self
    }

    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Configured algorithm, round-robin when unset.
    pub fn algorithm(&self) -> Algorithm {
        self.load_balancer
            .as_ref()
            .map(|lb| lb.algorithm)
            .unwrap_or_default()
    }
}

/// Load balancer selection for a route.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct LoadBalancerConfig {
    pub algorithm: Algorithm,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in Closed before the breaker trips.
    pub failure_threshold: u32,

    /// Time spent Open before trial calls are admitted, in milliseconds.
    pub reset_timeout_ms: u64,

    /// Trial calls admitted in HalfOpen; this many successes close the breaker.
    pub half_open_requests: u32,
}

impl CircuitBreakerConfig {
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 30_000,
            half_open_requests: 1,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, the first call included.
    pub max_attempts: u32,

    /// Delay before the second attempt in milliseconds.
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay in milliseconds.
    pub max_delay_ms: u64,

    /// Growth factor applied to the delay after each attempt.
    pub backoff_multiplier: f64,

    /// Status codes worth retrying; every failure is retried when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable_status_codes: Option<Vec<u16>>,

    /// Add up to 10% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 2000,
            backoff_multiplier: 2.0,
            retryable_status_codes: None,
            jitter: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_toml() {
        let raw = r#"
            [registry]
            heartbeat_interval_ms = 5000

            [[routes]]
            path = "/api/orders/*"
            service = "orders"
            methods = ["GET", "POST"]
            timeout_ms = 1500

            [routes.load_balancer]
            algorithm = "least-connections"

            [routes.circuit_breaker]
            failure_threshold = 2
            reset_timeout_ms = 1000

            [routes.retry]
            max_attempts = 4
            retryable_status_codes = [502, 503]
        "#;

        let config: GatewayConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.registry.heartbeat_interval_ms, 5000);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");

        let route = &config.routes[0];
        assert_eq!(route.algorithm(), Algorithm::LeastConnections);
        assert_eq!(route.timeout_ms, Some(1500));

        let cb = route.circuit_breaker.as_ref().unwrap();
        assert_eq!(cb.failure_threshold, 2);
        assert_eq!(cb.half_open_requests, 1);

        let retry = route.retry.as_ref().unwrap();
        assert_eq!(retry.max_attempts, 4);
        assert_eq!(retry.initial_delay_ms, 100);
        assert_eq!(retry.retryable_status_codes, Some(vec![502, 503]));
    }

    #[test]
    fn test_route_defaults_to_round_robin() {
        let route = RouteConfig::new("/users", "users", &["GET"]);
        assert_eq!(route.algorithm(), Algorithm::RoundRobin);
    }
}
