//! Gateway core.
//!
//! # Data Flow
//! ```text
//! GatewayRequest
//!     → router.rs (route match)
//!     → registry (healthy instances)
//!     → load balancer (select)
//!     → circuit breaker → timeout → transport.rs (downstream call)
//!     → retry loop on failure
//!     → metrics funnel
//!     → DownstreamResponse or GatewayError
//! ```

pub mod health;
pub mod router;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use health::{HealthReport, ServiceHealth, ServiceStatus};
pub use router::GatewayRouter;
pub use transport::{DownstreamResponse, GatewayRequest, Transport};
