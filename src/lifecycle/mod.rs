//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Logging → Metrics exporter → Gateway → Sweeper
//!     → Config watcher → Admin listener → Gateway listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Listeners drain, sweeper stops → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Listeners start last (traffic only when ready)
//! - Route reloads come from the config watcher, not from signals

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
