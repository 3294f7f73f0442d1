//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Client request
//!     → server.rs (Axum, request ID, limits, buffer body)
//!     → GatewayRouter::route
//!     → client.rs (Transport impl: forward to http://host:port)
//!     → server.rs (downstream response or JSON error)
//!     → Send to client
//! ```

pub mod client;
pub mod server;

pub use client::HttpTransport;
pub use server::{HttpServer, X_REQUEST_ID};
