//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Readiness probe (probe.rs):
//!     /readyz on the admin listener
//!     → single GET <upstream><health path>, short timeout
//!     → true on 200, false otherwise
//!
//! Startup wait (ready.rs):
//!     backoff loop over probe.rs until the first success
//! ```
//!
//! # Design Decisions
//! - The prober never errors; every failure is `false`
//! - Probe timeout is independent of the long proxy-path timeouts
//! - Probes use their own client so they never queue behind traffic

pub mod probe;
pub mod ready;

pub use probe::HealthProber;
pub use ready::wait_until_ready;
