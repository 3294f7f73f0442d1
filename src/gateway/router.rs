//! Request orchestration.
//!
//! # Responsibilities
//! - Match the request against the route table
//! - Discover healthy instances and pick one through the route's balancer
//! - Guard the downstream call with the service's breaker and the route's timeout
//! - Retry per the route's policy
//! - Feed the balancer and the gateway-wide metrics
//! - Expose the administrative surface
//!
//! # Design Decisions
//! - Discovery and selection run again on every attempt
//! - The timeout sits inside the breaker so a timed-out call counts as a failure
//! - Errors are returned as produced; bookkeeping never alters them

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{GatewayConfig, RouteConfig, ValidationError};
use crate::error::{GatewayError, Result};
use crate::gateway::health::HealthReport;
use crate::gateway::transport::{DownstreamResponse, GatewayRequest, Transport};
use crate::load_balancer::{Algorithm, BalancerPool, BalancerStats, LoadBalancer};
use crate::observability::{GatewayMetrics, MetricsSnapshot, RequestOutcome};
use crate::registry::ServiceRegistry;
use crate::resilience::timeouts::with_timeout;
use crate::resilience::{BreakerRegistry, BreakerStats, CircuitBreaker, RetryPolicy};
use crate::routing::RouteTable;

/// The gateway core. Cheap to share behind an `Arc`.
pub struct GatewayRouter {
    registry: Arc<ServiceRegistry>,
    routes: RouteTable,
    balancers: BalancerPool,
    breakers: BreakerRegistry,
    metrics: Arc<GatewayMetrics>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for GatewayRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRouter")
            .field("routes", &self.routes.len())
            .field("instances", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl GatewayRouter {
    /// Create a router with an empty route table.
    pub fn new(registry: Arc<ServiceRegistry>, transport: Arc<dyn Transport>) -> Self {
        let metrics = Arc::new(GatewayMetrics::new());
        Self {
            registry,
            routes: RouteTable::new(),
            balancers: BalancerPool::new(),
            breakers: BreakerRegistry::new(metrics.clone()),
            metrics,
            transport,
        }
    }

    /// Build a router, and its registry, from bootstrap configuration.
    pub fn from_config(config: &GatewayConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let registry = Arc::new(ServiceRegistry::new(config.registry.heartbeat_interval()));
        let router = Self::new(registry, transport);
        router.replace_routes(config.routes.clone())?;
        Ok(router)
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Route one request to a downstream instance.
    pub async fn route(&self, request: &GatewayRequest) -> Result<DownstreamResponse> {
        let started = Instant::now();

        let Some(route) = self
            .routes
            .match_request(request.method.as_str(), &request.path)
        else {
            tracing::debug!(method = %request.method, path = %request.path, "No route matched");
            self.metrics.record(&RequestOutcome {
                service: None,
                success: false,
                elapsed: started.elapsed(),
                retries: 0,
            });
            return Err(GatewayError::RouteNotFound {
                method: request.method.to_string(),
                path: request.path.clone(),
            });
        };

        let config = &route.config;
        let policy = RetryPolicy::from_route(config.retry.as_ref());
        let balancer = self.balancers.get_or_create(&config.service, config.algorithm());
        let breaker = config
            .circuit_breaker
            .as_ref()
            .map(|cb| self.breakers.get_or_create(&config.service, cb));
        let timeout = config.timeout_ms.map(Duration::from_millis);

        let balancer = balancer.as_ref();
        let breaker = breaker.as_ref();
        let outcome = policy
            .execute(move |_attempt| self.attempt(config, balancer, breaker, timeout, request))
            .await;

        self.metrics.record(&RequestOutcome {
            service: Some(&config.service),
            success: outcome.result.is_ok(),
            elapsed: started.elapsed(),
            retries: outcome.attempts.saturating_sub(1),
        });

        if let Err(error) = &outcome.result {
            tracing::debug!(
                service = %config.service,
                attempts = outcome.attempts,
                error = %error,
                "Request failed"
            );
        }
        outcome.result
    }

    /// One attempt: discovery, selection, protected call, balancer bookkeeping.
    async fn attempt(
        &self,
        route: &RouteConfig,
        balancer: &LoadBalancer,
        breaker: Option<&CircuitBreaker>,
        timeout: Option<Duration>,
        request: &GatewayRequest,
    ) -> Result<DownstreamResponse> {
        let instances = self.registry.get_services_by_name(&route.service);
        if instances.is_empty() {
            return Err(GatewayError::NoInstancesAvailable(route.service.clone()));
        }

        let instance = balancer
            .select_instance(&instances)
            .ok_or_else(|| GatewayError::NoHealthyInstance(route.service.clone()))?;

        let started = Instant::now();
        let call = with_timeout(timeout, async {
            self.transport
                .call(&instance, request)
                .await
                .map_err(GatewayError::from)
        });
        let result = match breaker {
            Some(breaker) => breaker.execute(|| call).await,
            None => call.await,
        };

        match &result {
            Ok(_) => {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                balancer.record_response(&instance.id, elapsed_ms);
            }
            Err(error) => {
                tracing::debug!(
                    service = %route.service,
                    instance = %instance.id,
                    error = %error,
                    "Downstream attempt failed"
                );
                balancer.record_failure(&instance.id);
            }
        }
        result
    }

    // Administrative surface

    pub fn get_health(&self) -> HealthReport {
        HealthReport::collect(
            &self.registry,
            &self.routes.list(),
            self.breakers.all_stats(),
            self.all_balancer_stats(),
            self.metrics.uptime(),
        )
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn get_routes(&self) -> Vec<RouteConfig> {
        self.routes.list()
    }

    /// Append a route after validating it.
    pub fn add_route(&self, route: RouteConfig) -> Result<()> {
        self.routes.add(route).map_err(invalid_route)
    }

    pub fn remove_route(&self, path: &str) -> bool {
        self.routes.remove(path)
    }

    /// Swap the whole route list; the current list stays if any route is invalid.
    pub fn replace_routes(&self, routes: Vec<RouteConfig>) -> Result<()> {
        self.routes.replace(routes).map_err(invalid_route)
    }

    pub fn breaker_stats(&self, service: &str) -> Option<BreakerStats> {
        self.breakers.stats(service)
    }

    pub fn all_breaker_stats(&self) -> Vec<BreakerStats> {
        self.breakers.all_stats()
    }

    pub fn reset_breaker(&self, service: &str) -> bool {
        self.breakers.reset(service)
    }

    pub fn balancer_stats(&self, service: &str, algorithm: Algorithm) -> Option<BalancerStats> {
        self.balancers
            .stats(service, algorithm)
            .map(|stats| stats.with_registry_health(&self.registry))
    }

    pub fn all_balancer_stats(&self) -> Vec<BalancerStats> {
        self.balancers
            .all_stats()
            .into_iter()
            .map(|stats| stats.with_registry_health(&self.registry))
            .collect()
    }

    pub fn reset_balancer(&self, service: &str, algorithm: Algorithm) -> bool {
        self.balancers.reset(service, algorithm)
    }
}

fn invalid_route(errors: Vec<ValidationError>) -> GatewayError {
    let message = errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    GatewayError::InvalidRoute(message)
}
