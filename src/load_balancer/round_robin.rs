//! Round-robin load balancing strategy.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use crate::load_balancer::{InstanceStats, Strategy};
use crate::registry::ServiceInstance;

/// Round-robin selector.
/// Stores an internal counter to rotate through instances.
///
/// The counter is taken modulo the current list length and is not reset when
/// the healthy set changes, so a membership change can skip or repeat one
/// instance on the next pick.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for RoundRobin {
    fn next_index(
        &self,
        instances: &[ServiceInstance],
        _stats: &HashMap<String, InstanceStats>,
    ) -> Option<usize> {
        if instances.is_empty() {
            return None;
        }

        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        Some(count % instances.len())
    }

    fn reset(&self) {
        self.counter.store(0, Ordering::Relaxed);
    }
}
