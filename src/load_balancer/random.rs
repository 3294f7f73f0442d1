//! Uniform random load balancing strategy.

use rand::Rng;
use std::collections::HashMap;
use crate::load_balancer::{InstanceStats, Strategy};
use crate::registry::ServiceInstance;

#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for Random {
    fn next_index(
        &self,
        instances: &[ServiceInstance],
        _stats: &HashMap<String, InstanceStats>,
    ) -> Option<usize> {
        if instances.is_empty() {
            return None;
        }
        Some(rand::thread_rng().gen_range(0..instances.len()))
    }
}
