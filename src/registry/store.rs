//! In-memory service registry.
//!
//! # Responsibilities
//! - Upsert/remove instances by id
//! - Refresh heartbeats
//! - Answer "which healthy instances serve X" in registration order
//! - Flip stale instances to unhealthy (never delete them)

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::registry::instance::{HealthState, Registration, ServiceInstance};

/// Registry of known instances, keyed by instance id.
#[derive(Debug)]
pub struct ServiceRegistry {
    instances: DashMap<String, ServiceInstance>,
    heartbeat_interval: Duration,
    next_seq: AtomicU64,
}

impl ServiceRegistry {
    pub fn new(heartbeat_interval: Duration) -> Self {
        Self {
            instances: DashMap::new(),
            heartbeat_interval,
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Insert or replace an instance. Heartbeat is set to now and health to healthy.
    pub fn register(&self, mut instance: ServiceInstance) {
        instance.last_heartbeat = Instant::now();
        instance.health = HealthState::Healthy;

        // Last write wins, but an upsert keeps its place in listings.
        instance.seq = match self.instances.get(&instance.id) {
            Some(existing) => existing.seq,
            None => self.next_seq.fetch_add(1, Ordering::Relaxed),
        };

        tracing::info!(
            instance = %instance.id,
            service = %instance.name,
            address = %instance.address(),
            "Instance registered"
        );
        self.instances.insert(instance.id.clone(), instance);
    }

    /// Registration API form. Returns the instance id.
    pub fn register_service(
        &self,
        name: &str,
        host: &str,
        port: u16,
        metadata: HashMap<String, String>,
    ) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.register(ServiceInstance::new(id.clone(), name, host, port).with_metadata(metadata));
        id
    }

    /// Register from an API payload, generating an id when none is given.
    pub fn register_from(&self, registration: Registration) -> String {
        let id = registration
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        self.register(
            ServiceInstance::new(id.clone(), registration.name, registration.host, registration.port)
                .with_metadata(registration.metadata),
        );
        id
    }

    /// Remove an instance. Returns false if it was unknown.
    pub fn unregister(&self, id: &str) -> bool {
        match self.instances.remove(id) {
            Some((_, instance)) => {
                tracing::info!(instance = %id, service = %instance.name, "Instance unregistered");
                true
            }
            None => false,
        }
    }

    /// Refresh an instance heartbeat and mark it healthy. Returns false if unknown.
    pub fn update_heartbeat(&self, id: &str) -> bool {
        match self.instances.get_mut(id) {
            Some(mut instance) => {
                instance.last_heartbeat = Instant::now();
                if instance.health != HealthState::Healthy {
                    tracing::info!(instance = %id, service = %instance.name, "Instance recovered via heartbeat");
                }
                instance.health = HealthState::Healthy;
                true
            }
            None => false,
        }
    }

    /// Healthy instances of a service, in registration order.
    pub fn get_services_by_name(&self, name: &str) -> Vec<ServiceInstance> {
        let mut found: Vec<ServiceInstance> = self
            .instances
            .iter()
            .filter(|entry| entry.name == name && entry.is_healthy())
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|i| i.seq);
        found
    }

    /// Every instance regardless of health, in registration order.
    pub fn get_all_services(&self) -> Vec<ServiceInstance> {
        let mut all: Vec<ServiceInstance> = self
            .instances
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(|i| i.seq);
        all
    }

    pub fn get(&self, id: &str) -> Option<ServiceInstance> {
        self.instances.get(id).map(|entry| entry.value().clone())
    }

    /// Distinct service names with at least one registered instance.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .instances
            .iter()
            .map(|entry| entry.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Flip every instance whose heartbeat is older than twice the interval.
    ///
    /// Returns the ids that changed state on this pass.
    pub fn sweep(&self) -> Vec<String> {
        let max_age = self.heartbeat_interval * 2;
        let mut flipped = Vec::new();

        for mut entry in self.instances.iter_mut() {
            let age = entry.heartbeat_age();
            if entry.health == HealthState::Healthy && age > max_age {
                entry.health = HealthState::Unhealthy;
                tracing::warn!(
                    instance = %entry.id,
                    service = %entry.name,
                    heartbeat_age_ms = age.as_millis() as u64,
                    "Instance marked unhealthy: heartbeat is stale"
                );
                flipped.push(entry.id.clone());
            }
        }

        flipped
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
