//! Balancer pool management.
//!
//! # Responsibilities
//! - Hold exactly one LoadBalancer per (service, algorithm)
//! - Create balancers lazily on first use, never twice
//! - Expose stats and reset for the admin surface

use dashmap::DashMap;
use std::sync::Arc;

use crate::load_balancer::{Algorithm, BalancerStats, LoadBalancer};

#[derive(Debug, Default)]
pub struct BalancerPool {
    balancers: DashMap<(String, Algorithm), Arc<LoadBalancer>>,
}

impl BalancerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// The balancer for this key, creating it on first use.
    pub fn get_or_create(&self, service: &str, algorithm: Algorithm) -> Arc<LoadBalancer> {
        self.balancers
            .entry((service.to_string(), algorithm))
            .or_insert_with(|| {
                tracing::debug!(service = %service, algorithm = %algorithm, "Creating load balancer");
                Arc::new(LoadBalancer::new(service, algorithm))
            })
            .value()
            .clone()
    }

    pub fn get(&self, service: &str, algorithm: Algorithm) -> Option<Arc<LoadBalancer>> {
        self.balancers
            .get(&(service.to_string(), algorithm))
            .map(|entry| entry.value().clone())
    }

    pub fn stats(&self, service: &str, algorithm: Algorithm) -> Option<BalancerStats> {
        self.get(service, algorithm).map(|lb| lb.stats())
    }

    /// Stats of every balancer, ordered by service then algorithm.
    pub fn all_stats(&self) -> Vec<BalancerStats> {
        let mut all: Vec<Arc<LoadBalancer>> = self
            .balancers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| (a.service(), a.algorithm()).cmp(&(b.service(), b.algorithm())));
        all.iter().map(|lb| lb.stats()).collect()
    }

    /// Reset one balancer. Returns false if it does not exist.
    pub fn reset(&self, service: &str, algorithm: Algorithm) -> bool {
        match self.get(service, algorithm) {
            Some(lb) => {
                lb.reset();
                true
            }
            None => false,
        }
    }
}
