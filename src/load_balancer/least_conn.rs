//! Least Connections load balancing strategy.

use std::collections::HashMap;
use crate::load_balancer::{InstanceStats, Strategy};
use crate::registry::ServiceInstance;

/// Least connections selector.
/// Selects the instance with the minimum number of active connections.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for LeastConnections {
    fn next_index(
        &self,
        instances: &[ServiceInstance],
        stats: &HashMap<String, InstanceStats>,
    ) -> Option<usize> {
        // In case of tie, the first one is selected (stability)
        instances
            .iter()
            .enumerate()
            .min_by_key(|(_, instance)| {
                stats
                    .get(&instance.id)
                    .map(|s| s.active_connections)
                    .unwrap_or(0)
            })
            .map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_least_conn() {
        let lc = LeastConnections::new();
        let list = vec![
            ServiceInstance::new("a", "svc", "127.0.0.1", 8080),
            ServiceInstance::new("b", "svc", "127.0.0.1", 8081),
        ];

        let mut stats = HashMap::new();
        let mut busy = InstanceStats::default();
        busy.active_connections = 1;
        stats.insert("a".to_string(), busy);

        // Should pick b (0 connections)
        assert_eq!(lc.next_index(&list, &stats), Some(1));

        let mut busier = InstanceStats::default();
        busier.active_connections = 2;
        stats.insert("b".to_string(), busier);

        // Should pick a (1 connection)
        assert_eq!(lc.next_index(&list, &stats), Some(0));
    }

    #[test]
    fn test_tie_goes_to_list_order() {
        let lc = LeastConnections::new();
        let list = vec![
            ServiceInstance::new("a", "svc", "127.0.0.1", 8080),
            ServiceInstance::new("b", "svc", "127.0.0.1", 8081),
        ];
        assert_eq!(lc.next_index(&list, &HashMap::new()), Some(0));
        assert_eq!(lc.next_index(&[], &HashMap::new()), None);
    }
}
