//! Health report aggregation.
//!
//! A service is up iff the registry returns at least one healthy instance for
//! it. Services are gathered from both the registry and the route table, so a
//! routed service with no registrations shows up as down.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::RouteConfig;
use crate::load_balancer::BalancerStats;
use crate::registry::ServiceRegistry;
use crate::resilience::BreakerStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    pub healthy_instances: usize,
    pub total_instances: usize,
}

/// Gateway-wide health.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// "healthy" when every known service is up, "degraded" otherwise.
    pub status: &'static str,
    pub uptime_secs: f64,
    pub services: BTreeMap<String, ServiceHealth>,
    pub circuit_breakers: Vec<BreakerStats>,
    pub load_balancers: Vec<BalancerStats>,
}

impl HealthReport {
    pub(crate) fn collect(
        registry: &ServiceRegistry,
        routes: &[RouteConfig],
        circuit_breakers: Vec<BreakerStats>,
        load_balancers: Vec<BalancerStats>,
        uptime: Duration,
    ) -> Self {
        let mut totals: BTreeMap<String, usize> = BTreeMap::new();
        for instance in registry.get_all_services() {
            *totals.entry(instance.name).or_default() += 1;
        }
        for route in routes {
            totals.entry(route.service.clone()).or_default();
        }

        let services: BTreeMap<String, ServiceHealth> = totals
            .into_iter()
            .map(|(name, total_instances)| {
                let healthy_instances = registry.get_services_by_name(&name).len();
                let status = if healthy_instances > 0 {
                    ServiceStatus::Up
                } else {
                    ServiceStatus::Down
                };
                let health = ServiceHealth {
                    status,
                    healthy_instances,
                    total_instances,
                };
                (name, health)
            })
            .collect();

        let status = if services.values().all(|s| s.status == ServiceStatus::Up) {
            "healthy"
        } else {
            "degraded"
        };

        Self {
            status,
            uptime_secs: uptime.as_secs_f64(),
            services,
            circuit_breakers,
            load_balancers,
        }
    }

    pub fn is_up(&self, service: &str) -> bool {
        self.services
            .get(service)
            .map(|s| s.status == ServiceStatus::Up)
            .unwrap_or(false)
    }
}
