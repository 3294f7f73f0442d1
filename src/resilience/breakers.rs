//! Per-service breaker registry.
//!
//! # Responsibilities
//! - Hold exactly one CircuitBreaker per service name
//! - Create breakers lazily from the first route config that needs one
//! - Expose stats and reset for the admin surface

use dashmap::DashMap;
use std::sync::Arc;

use crate::config::CircuitBreakerConfig;
use crate::observability::GatewayMetrics;
use crate::resilience::circuit_breaker::{BreakerStats, CircuitBreaker};

#[derive(Debug)]
pub struct BreakerRegistry {
    breakers: DashMap<String, CircuitBreaker>,
    metrics: Arc<GatewayMetrics>,
}

impl BreakerRegistry {
    pub fn new(metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            breakers: DashMap::new(),
            metrics,
        }
    }

    /// The breaker for `service`, created with `config` on first use.
    ///
    /// Later calls return the existing breaker even if `config` differs.
    pub fn get_or_create(&self, service: &str, config: &CircuitBreakerConfig) -> CircuitBreaker {
        self.breakers
            .entry(service.to_string())
            .or_insert_with(|| {
                tracing::debug!(service = %service, "Creating circuit breaker");
                CircuitBreaker::with_metrics(service, config.clone(), self.metrics.clone())
            })
            .value()
            .clone()
    }

    pub fn get(&self, service: &str) -> Option<CircuitBreaker> {
        self.breakers.get(service).map(|entry| entry.value().clone())
    }

    pub fn stats(&self, service: &str) -> Option<BreakerStats> {
        self.get(service).map(|cb| cb.stats())
    }

    /// Stats of every breaker, ordered by service.
    pub fn all_stats(&self) -> Vec<BreakerStats> {
        let mut all: Vec<BreakerStats> = self
            .breakers
            .iter()
            .map(|entry| entry.value().stats())
            .collect();
        all.sort_by(|a, b| a.service.cmp(&b.service));
        all
    }

    /// Reset one breaker. Returns false if it does not exist.
    pub fn reset(&self, service: &str) -> bool {
        match self.get(service) {
            Some(cb) => {
                cb.reset();
                true
            }
            None => false,
        }
    }
}
