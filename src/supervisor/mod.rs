//! Upstream process supervision.
//!
//! # Data Flow
//! ```text
//! SupervisorConfig + upstream port
//!     → command.rs (argv with ${PORT} resolved, env check)
//!     → process.rs (spawn, monitor task)
//!     → state watch: Starting → Running → {Exited, Killed}
//!     → on exit: grace period → shutdown escalation
//! ```
//!
//! # Design Decisions
//! - The supervisor exclusively owns the child; nothing else signals it
//! - Launch failures are fatal and never retried
//! - Escalation goes through the shutdown coordinator by default; SIGTERM to
//!   self is the fallback mode

pub mod command;
pub mod process;

pub use command::{LaunchSpec, PORT_PLACEHOLDER};
pub use process::{EscalationAction, ProcessState, UpstreamSupervisor};

/// Supervisor errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("supervisor command is empty")]
    EmptyCommand,

    #[error("required environment variable {0} is not set")]
    MissingEnv(String),

    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("upstream process exited during launch")]
    ExitedAtLaunch,
}
