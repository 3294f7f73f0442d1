//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → service identified
//!     → registry (healthy instances, registration order)
//!     → pool.rs (balancer for (service, algorithm), created once)
//!     → balancer.rs applies the algorithm:
//!         - round_robin.rs (rotate through instances)
//!         - least_conn.rs (pick instance with fewest active connections)
//!         - random.rs (uniform pick)
//!     → stats.rs (request count, active connections, response-time EMA)
//! ```
//!
//! # Design Decisions
//! - Strategies are stateless apart from the round-robin cursor
//! - Selection and stats update happen under one lock
//! - The round-robin cursor survives membership changes

pub mod balancer;
pub mod least_conn;
pub mod pool;
pub mod random;
pub mod round_robin;
pub mod stats;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::registry::ServiceInstance;

pub use balancer::{BalancerStats, LoadBalancer};
pub use pool::BalancerPool;
pub use stats::InstanceStats;

/// Trait for instance selection algorithms.
pub trait Strategy: Send + Sync + fmt::Debug {
    /// Index of the chosen instance, or None when the list is empty.
    fn next_index(
        &self,
        instances: &[ServiceInstance],
        stats: &HashMap<String, InstanceStats>,
    ) -> Option<usize>;

    /// Forget any selection state.
    fn reset(&self) {}
}

/// Supported load balancing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    #[default]
    RoundRobin,
    LeastConnections,
    Random,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::RoundRobin => "round-robin",
            Algorithm::LeastConnections => "least-connections",
            Algorithm::Random => "random",
        }
    }

    /// Build the strategy implementing this algorithm.
    pub fn strategy(&self) -> Box<dyn Strategy> {
        match self {
            Algorithm::RoundRobin => Box::new(round_robin::RoundRobin::new()),
            Algorithm::LeastConnections => Box::new(least_conn::LeastConnections::new()),
            Algorithm::Random => Box::new(random::Random::new()),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round-robin" => Ok(Algorithm::RoundRobin),
            "least-connections" => Ok(Algorithm::LeastConnections),
            "random" => Ok(Algorithm::Random),
            other => Err(format!("unknown load balancing algorithm '{}'", other)),
        }
    }
}
