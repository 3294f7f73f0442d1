//! Service registry subsystem.
//!
//! # Data Flow
//! ```text
//! Backend service (gateway-sdk / admin API / in-process):
//!     register → store.rs (upsert, heartbeat = now, healthy)
//!     heartbeat → store.rs (refresh, healthy)
//!
//! sweeper.rs (every heartbeat interval):
//!     heartbeat age > 2 × interval → Unhealthy (entry kept)
//!
//! GatewayRouter:
//!     get_services_by_name → healthy instances only
//! ```
//!
//! # Design Decisions
//! - Health is heartbeat driven; entries are only removed by unregister
//! - Concurrent register/unregister are last-write-wins
//! - Listings follow registration order so balancing is deterministic

pub mod instance;
pub mod store;
pub mod sweeper;

pub use instance::{HealthState, InstanceSnapshot, Registration, ServiceInstance};
pub use store::ServiceRegistry;
pub use sweeper::HealthSweeper;
