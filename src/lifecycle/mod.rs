//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Launch upstream → Start readiness wait → Bind listeners → Serve
//!
//! Shutdown (shutdown.rs):
//!     Trigger (signal or upstream death) → Stop accepting → Drain → Stop upstream
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: upstream process first, then listeners
//! - Ordered shutdown: stop accept, drain, close pool, stop the child
//! - Draining has a deadline; in-flight requests past it are dropped

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownListener, ShutdownReason};
pub use startup::{run, run_with_shutdown, RunOutcome, StartupError};
