//! Service instance abstraction.
//!
//! # Responsibilities
//! - Represent a single backend instance of a logical service
//! - Track heartbeat-driven health state (Healthy/Unhealthy)
//! - Provide a serializable snapshot for the admin surface

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Health State enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

/// A single backend instance.
#[derive(Debug, Clone)]
pub struct ServiceInstance {
    /// Unique instance identifier.
    pub id: String,
    /// Logical service this instance belongs to.
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Current health state.
    pub health: HealthState,
    /// Last heartbeat (monotonic clock).
    pub last_heartbeat: Instant,
    /// Wall clock time of the first registration.
    pub registered_at: SystemTime,
    pub metadata: HashMap<String, String>,
    /// Registration order, kept across upserts.
    pub(crate) seq: u64,
}

impl ServiceInstance {
    /// Create a new, healthy instance with a fresh heartbeat.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            host: host.into(),
            port,
            health: HealthState::Healthy,
            last_heartbeat: Instant::now(),
            registered_at: SystemTime::now(),
            metadata: HashMap::new(),
            seq: 0,
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// `host:port` of the instance.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_healthy(&self) -> bool {
        self.health == HealthState::Healthy
    }

    /// Time elapsed since the last heartbeat.
    pub fn heartbeat_age(&self) -> Duration {
        self.last_heartbeat.elapsed()
    }

    pub fn snapshot(&self) -> InstanceSnapshot {
        InstanceSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            host: self.host.clone(),
            port: self.port,
            health: self.health,
            heartbeat_age_ms: self.heartbeat_age().as_millis() as u64,
            registered_at_ms: self
                .registered_at
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            metadata: self.metadata.clone(),
        }
    }
}

/// Serializable view of an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub health: HealthState,
    pub heartbeat_age_ms: u64,
    pub registered_at_ms: u64,
    pub metadata: HashMap<String, String>,
}

/// Registration request from a backend service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    /// Reuse an id to upsert; a fresh id is generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}
