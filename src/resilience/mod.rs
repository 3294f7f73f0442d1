//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt against a selected instance:
//!     → circuit_breaker.rs (fail fast when Open, record outcome)
//!     → timeouts.rs (race the downstream call against the route timeout)
//!     → On failure: retries.rs (check if retryable, sleep per backoff.rs, try again)
//!
//! breakers.rs keeps one breaker per service.
//! ```
//!
//! # Design Decisions
//! - Timeouts sit inside the breaker, so a timeout counts as a failure
//! - The breaker never rewrites errors
//! - Retries re-run discovery and selection, so a retry may land on another instance

pub mod backoff;
pub mod breakers;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use breakers::BreakerRegistry;
pub use circuit_breaker::{BreakerStats, CircuitBreaker, CircuitState};
pub use retries::{RetryOutcome, RetryPolicy};
