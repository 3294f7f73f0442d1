//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (gateway aggregate + Prometheus counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Admin API (/admin/metrics, /admin/health)
//! ```

pub mod logging;
pub mod metrics;

pub use metrics::{GatewayMetrics, MetricsSnapshot, RequestOutcome};
