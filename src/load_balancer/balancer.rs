//! Stateful load balancer for one (service, algorithm) pair.
//!
//! # Responsibilities
//! - Pick an instance from the healthy list using a Strategy
//! - Track request counts, active connections and response-time EMA
//! - Reset cursor and stats on demand

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::load_balancer::{Algorithm, InstanceStats, Strategy};
use crate::registry::{ServiceInstance, ServiceRegistry};

#[derive(Debug)]
pub struct LoadBalancer {
    service: String,
    algorithm: Algorithm,
    strategy: Box<dyn Strategy>,
    stats: Mutex<HashMap<String, InstanceStats>>,
}

/// Snapshot of a balancer for the admin surface.
#[derive(Debug, Clone, Serialize)]
pub struct BalancerStats {
    pub service: String,
    pub algorithm: Algorithm,
    pub instances: BTreeMap<String, InstanceStats>,
}

impl BalancerStats {
    /// Overwrite each health flag with the registry's current view.
    ///
    /// Instances that are no longer registered read as unhealthy.
    pub fn with_registry_health(mut self, registry: &ServiceRegistry) -> Self {
        for (id, stats) in self.instances.iter_mut() {
            stats.healthy = registry.get(id).is_some_and(|i| i.is_healthy());
        }
        self
    }
}

impl LoadBalancer {
    pub fn new(service: impl Into<String>, algorithm: Algorithm) -> Self {
        Self {
            service: service.into(),
            algorithm,
            strategy: algorithm.strategy(),
            stats: Mutex::new(HashMap::new()),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn lock_stats(&self) -> MutexGuard<'_, HashMap<String, InstanceStats>> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Select an instance. Returns None when the list is empty.
    pub fn select_instance(&self, instances: &[ServiceInstance]) -> Option<ServiceInstance> {
        let mut stats = self.lock_stats();
        let index = self.strategy.next_index(instances, &stats)?;
        let chosen = instances.get(index)?.clone();

        for (id, entry) in stats.iter_mut() {
            entry.healthy = instances.iter().any(|i| &i.id == id);
        }
        stats.entry(chosen.id.clone()).or_default().on_selected();

        tracing::debug!(
            service = %self.service,
            algorithm = %self.algorithm,
            instance = %chosen.id,
            address = %chosen.address(),
            "Selected instance"
        );
        Some(chosen)
    }

    /// Record a completed call's response time.
    pub fn record_response(&self, instance_id: &str, elapsed_ms: f64) {
        self.lock_stats()
            .entry(instance_id.to_string())
            .or_default()
            .on_response(elapsed_ms);
    }

    /// Release the connection slot of a failed call.
    pub fn record_failure(&self, instance_id: &str) {
        self.lock_stats()
            .entry(instance_id.to_string())
            .or_default()
            .on_failure();
    }

    /// Clear the cursor and all stats.
    pub fn reset(&self) {
        let mut stats = self.lock_stats();
        stats.clear();
        self.strategy.reset();
        tracing::info!(service = %self.service, algorithm = %self.algorithm, "Load balancer reset");
    }

    pub fn instance_stats(&self, instance_id: &str) -> Option<InstanceStats> {
        self.lock_stats().get(instance_id).cloned()
    }

    pub fn stats(&self) -> BalancerStats {
        BalancerStats {
            service: self.service.clone(),
            algorithm: self.algorithm,
            instances: self
                .lock_stats()
                .iter()
                .map(|(id, s)| (id.clone(), s.clone()))
                .collect(),
        }
    }
}
