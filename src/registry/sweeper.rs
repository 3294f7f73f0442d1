//! Periodic heartbeat sweep.
//!
//! # Responsibilities
//! - Run `ServiceRegistry::sweep` every heartbeat interval
//! - Publish per-service healthy instance gauges
//! - Stop on shutdown

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::registry::ServiceRegistry;

pub struct HealthSweeper {
    registry: Arc<ServiceRegistry>,
}

impl HealthSweeper {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self { registry }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let interval = self.registry.heartbeat_interval();
        tracing::info!(interval_ms = interval.as_millis() as u64, "Health sweeper starting");

        let mut ticker = time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    fn sweep_once(&self) {
        let flipped = self.registry.sweep();
        if !flipped.is_empty() {
            tracing::debug!(count = flipped.len(), "Sweep marked instances unhealthy");
        }

        for service in self.registry.service_names() {
            let healthy = self.registry.get_services_by_name(&service).len();
            metrics::record_service_health(&service, healthy);
        }
    }
}
