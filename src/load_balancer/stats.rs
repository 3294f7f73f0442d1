//! Per-instance balancing statistics.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Weight of the newest sample in the response-time average.
pub const EMA_ALPHA: f64 = 0.3;

/// Counters kept for each instance a balancer has selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceStats {
    /// Times this instance was selected.
    pub request_count: u64,
    /// Selected calls not yet answered.
    pub active_connections: u64,
    /// Exponential moving average of response times.
    pub avg_response_time_ms: Option<f64>,
    /// Unix time of the last selection, in milliseconds.
    pub last_used_ms: Option<u64>,
    /// Whether the registry currently reports the instance healthy.
    pub healthy: bool,
    /// Calls that ended in an error.
    pub failure_count: u64,
}

impl InstanceStats {
    /// Account for a new selection.
    pub fn on_selected(&mut self) {
        self.request_count += 1;
        self.active_connections += 1;
        self.healthy = true;
        self.last_used_ms = Some(unix_millis());
    }

    /// Fold a response time into the average and free the connection slot.
    pub fn on_response(&mut self, elapsed_ms: f64) {
        self.avg_response_time_ms = Some(match self.avg_response_time_ms {
            Some(previous) => EMA_ALPHA * elapsed_ms + (1.0 - EMA_ALPHA) * previous,
            None => elapsed_ms,
        });
        self.active_connections = self.active_connections.saturating_sub(1);
    }

    /// Free the connection slot of a failed call.
    pub fn on_failure(&mut self) {
        self.failure_count += 1;
        self.active_connections = self.active_connections.saturating_sub(1);
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
