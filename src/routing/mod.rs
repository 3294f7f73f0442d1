//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (method, path)
//!     → table.rs (ordered scan)
//!     → matcher.rs (method set AND path pattern)
//!     → Return: matched Route or None
//!
//! Route changes (admin API, config reload):
//!     RouteConfig
//!     → validation
//!     → compile matchers
//!     → publish new list atomically
//! ```
//!
//! # Design Decisions
//! - Routes are mutable at runtime without a restart
//! - Deterministic: same table and input always match the same route
//! - First match wins (registration order)

pub mod matcher;
pub mod table;

pub use table::{Route, RouteTable};
