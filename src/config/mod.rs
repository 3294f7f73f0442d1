//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated)
//!     → routes handed to the GatewayRouter, everything else to startup
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → route list swapped atomically in the RouteTable
//! ```
//!
//! # Design Decisions
//! - Only routes hot reload; listener/admin settings need a restart
//! - All fields have defaults to allow minimal configs
//! - Runtime route edits through the admin API are never written back to disk

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, CircuitBreakerConfig, GatewayConfig, ListenerConfig, LoadBalancerConfig,
    LogFormat, ObservabilityConfig, RegistryConfig, RetryConfig, RouteConfig, TransportConfig,
};
pub use validation::{validate_config, validate_route, ValidationError};
