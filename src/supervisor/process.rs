//! Supervised upstream process.
//!
//! # Responsibilities
//! - Spawn the upstream and own its child handle
//! - Watch for exit on a dedicated task and publish state transitions
//! - Escalate to a service shutdown once the grace period after death ends
//! - Stop the child on request: SIGTERM, bounded wait, then SIGKILL

use std::time::Duration;

use tokio::process::Child;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::{EscalationMode, SupervisorConfig};
use crate::lifecycle::{Shutdown, ShutdownListener, ShutdownReason};
use crate::observability::metrics;
use crate::supervisor::command::LaunchSpec;
use crate::supervisor::SupervisorError;

/// Lifecycle of the upstream process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Starting,
    Running { pid: u32 },
    Exited { code: Option<i32> },
    /// SIGTERM sent, waiting for the child to go.
    Terminating { pid: u32 },
    /// Did not stop within the terminate timeout and was SIGKILLed.
    Killed,
}

impl ProcessState {
    pub fn label(&self) -> &'static str {
        match self {
            ProcessState::Starting => "starting",
            ProcessState::Running { .. } => "running",
            ProcessState::Exited { .. } => "exited",
            ProcessState::Terminating { .. } => "terminating",
            ProcessState::Killed => "killed",
        }
    }

    pub fn is_alive(&self) -> bool {
        matches!(
            self,
            ProcessState::Starting | ProcessState::Running { .. } | ProcessState::Terminating { .. }
        )
    }

    pub fn pid(&self) -> Option<u32> {
        match self {
            ProcessState::Running { pid } | ProcessState::Terminating { pid } => Some(*pid),
            _ => None,
        }
    }
}

/// What happens when the grace period after upstream death runs out.
#[derive(Debug, Clone)]
pub enum EscalationAction {
    /// Trigger the in-process shutdown coordinator.
    Cooperative(Shutdown),
    /// SIGTERM the hosting process.
    Signal,
}

impl EscalationAction {
    fn fire(&self, code: Option<i32>) {
        match self {
            EscalationAction::Cooperative(shutdown) => {
                shutdown.trigger(ShutdownReason::UpstreamExited { code });
            }
            EscalationAction::Signal => signal_self(),
        }
    }
}

#[cfg(unix)]
fn signal_self() {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::getpid;

    if let Err(e) = kill(getpid(), Signal::SIGTERM) {
        tracing::error!(error = %e, "Failed to send SIGTERM to self");
    }
}

#[cfg(not(unix))]
fn signal_self() {
    tracing::error!("Signal escalation is only supported on unix");
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    grace: Duration,
    terminate_timeout: Duration,
}

/// Owner of the upstream child process.
///
/// Dropping the supervisor without calling [`terminate`](Self::terminate)
/// still stops the child from the monitor task.
#[derive(Debug)]
pub struct UpstreamSupervisor {
    pid: u32,
    state: watch::Receiver<ProcessState>,
    stop_tx: Option<oneshot::Sender<()>>,
    monitor: Option<JoinHandle<()>>,
}

impl UpstreamSupervisor {
    /// Launch from configuration, escalating through `shutdown`.
    pub fn launch(
        spec: &LaunchSpec,
        config: &SupervisorConfig,
        shutdown: &Shutdown,
    ) -> Result<Self, SupervisorError> {
        let escalation = match config.escalation {
            EscalationMode::Cooperative => EscalationAction::Cooperative(shutdown.clone()),
            EscalationMode::Signal => EscalationAction::Signal,
        };
        Self::launch_with(
            spec,
            Duration::from_secs(config.grace_period_secs),
            Duration::from_secs(config.terminate_timeout_secs),
            escalation,
            shutdown.subscribe(),
        )
    }

    /// Launch with explicit timings. A shutdown observed on `cancel` during the
    /// grace period cancels the pending escalation.
    pub fn launch_with(
        spec: &LaunchSpec,
        grace: Duration,
        terminate_timeout: Duration,
        escalation: EscalationAction,
        cancel: ShutdownListener,
    ) -> Result<Self, SupervisorError> {
        spec.check_env()?;

        let (state_tx, state_rx) = watch::channel(ProcessState::Starting);
        let child = spec
            .command()
            .spawn()
            .map_err(|source| SupervisorError::Launch {
                program: spec.program.clone(),
                source,
            })?;
        let pid = child.id().ok_or(SupervisorError::ExitedAtLaunch)?;

        state_tx.send_replace(ProcessState::Running { pid });
        metrics::set_process_alive(true);
        tracing::info!(pid, program = %spec.program, args = ?spec.args, "Upstream process started");

        let (stop_tx, stop_rx) = oneshot::channel();
        let timing = Timing {
            grace,
            terminate_timeout,
        };
        let monitor = tokio::spawn(monitor(
            child, pid, state_tx, stop_rx, timing, escalation, cancel,
        ));

        Ok(Self {
            pid,
            state: state_rx,
            stop_tx: Some(stop_tx),
            monitor: Some(monitor),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn state(&self) -> ProcessState {
        *self.state.borrow()
    }

    /// Watch of state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ProcessState> {
        self.state.clone()
    }

    /// Stop the child (if still running) and wait for the monitor to finish.
    /// Also cancels a pending escalation.
    pub async fn terminate(mut self) -> ProcessState {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
        if let Some(monitor) = self.monitor.take() {
            if let Err(e) = monitor.await {
                tracing::error!(error = %e, "Upstream monitor task failed");
            }
        }
        self.state()
    }
}

async fn monitor(
    mut child: Child,
    pid: u32,
    state: watch::Sender<ProcessState>,
    mut stop: oneshot::Receiver<()>,
    timing: Timing,
    escalation: EscalationAction,
    mut cancel: ShutdownListener,
) {
    tokio::select! {
        status = child.wait() => {
            let code = match status {
                Ok(status) => status.code(),
                Err(e) => {
                    tracing::error!(pid, error = %e, "Failed to wait on upstream process");
                    None
                }
            };
            state.send_replace(ProcessState::Exited { code });
            metrics::set_process_alive(false);
            tracing::error!(
                pid,
                ?code,
                grace_secs = timing.grace.as_secs_f64(),
                "Upstream process exited, shutting down after grace period"
            );

            tokio::select! {
                _ = tokio::time::sleep(timing.grace) => {
                    tracing::warn!(pid, ?code, "Grace period elapsed, escalating shutdown");
                    escalation.fire(code);
                }
                _ = &mut stop => {
                    tracing::debug!(pid, "Escalation cancelled by terminate");
                }
                reason = cancel.recv() => {
                    tracing::info!(
                        pid,
                        ?reason,
                        "Shutdown started during grace period, escalation cancelled"
                    );
                }
            }
        }
        _ = &mut stop => {
            stop_child(&mut child, pid, timing.terminate_timeout, &state).await;
        }
    }
}

async fn stop_child(
    child: &mut Child,
    pid: u32,
    terminate_timeout: Duration,
    state: &watch::Sender<ProcessState>,
) {
    state.send_replace(ProcessState::Terminating { pid });
    tracing::info!(
        pid,
        timeout_secs = terminate_timeout.as_secs_f64(),
        "Stopping upstream process"
    );
    send_terminate(child, pid);

    let final_state = match tokio::time::timeout(terminate_timeout, child.wait()).await {
        Ok(Ok(status)) => {
            tracing::info!(pid, code = ?status.code(), "Upstream process stopped");
            ProcessState::Exited {
                code: status.code(),
            }
        }
        Ok(Err(e)) => {
            tracing::error!(pid, error = %e, "Failed to wait on upstream process, killing");
            kill_child(child, pid).await
        }
        Err(_) => {
            tracing::warn!(pid, "Upstream process did not stop in time, killing");
            kill_child(child, pid).await
        }
    };

    state.send_replace(final_state);
    metrics::set_process_alive(false);
}

#[cfg(unix)]
fn send_terminate(_child: &mut Child, pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        tracing::warn!(pid, error = %e, "Failed to send SIGTERM to upstream process");
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child, pid: u32) {
    if let Err(e) = child.start_kill() {
        tracing::warn!(pid, error = %e, "Failed to stop upstream process");
    }
}

async fn kill_child(child: &mut Child, pid: u32) -> ProcessState {
    if let Err(e) = child.kill().await {
        tracing::error!(pid, error = %e, "Failed to kill upstream process");
    }
    ProcessState::Killed
}
