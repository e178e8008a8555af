//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for SIGTERM and SIGINT
//! - Translate the first one into a graceful shutdown
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The listener task only triggers the coordinator; it never exits the process

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::{Shutdown, ShutdownReason};

/// Wait for SIGTERM or SIGINT and return the signal name.
pub async fn wait_for_termination() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        let mut interrupt = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = terminate.recv() => Ok("SIGTERM"),
            _ = interrupt.recv() => Ok("SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("ctrl-c")
    }
}

/// Spawn the task that turns termination signals into a shutdown.
pub fn spawn_signal_listener(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_termination().await {
            Ok(signal) => {
                tracing::info!(signal, "Termination signal received");
                shutdown.trigger(ShutdownReason::Signal);
            }
            Err(e) => tracing::error!(error = %e, "Failed to install signal handlers"),
        }
    })
}
