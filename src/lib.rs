//! Adaptive request gateway.
//!
//! Routes requests for a logical service to one of its registered instances,
//! guarded by a per-service circuit breaker, a per-route load balancing
//! algorithm and retries with exponential backoff.

// Core subsystems
pub mod config;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod routing;

// Traffic management
pub mod load_balancer;
pub mod resilience;

// Surfaces
pub mod admin;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::GatewayConfig;
pub use error::{DownstreamError, GatewayError};
pub use gateway::{DownstreamResponse, GatewayRequest, GatewayRouter, Transport};
pub use http::{HttpServer, HttpTransport};
pub use lifecycle::Shutdown;
