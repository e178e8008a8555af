//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request/stream/supervisor events
//!     → tracing spans and events (logging.rs)
//!     → metrics counters and gauges (metrics.rs)
//!     → Prometheus endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request IDs ride on the per-request span, not on forwarded headers
//! - Metrics are opt-in; recording without an exporter costs nothing

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
