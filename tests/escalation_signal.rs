//! Signal escalation sends SIGTERM to the whole test process, so it lives in
//! its own test binary with a handler installed before the child exits.

#![cfg(unix)]

use std::time::{Duration, Instant};

use tokio::signal::unix::{signal, SignalKind};
use upstream_proxy::lifecycle::Shutdown;
use upstream_proxy::supervisor::{EscalationAction, LaunchSpec, ProcessState, UpstreamSupervisor};

#[tokio::test]
async fn signal_escalation_terminates_host_after_grace_period() {
    let mut sigterm = signal(SignalKind::terminate()).unwrap();

    // Held for the whole test: dropping every handle would cancel escalation.
    let shutdown = Shutdown::new();
    let spec = LaunchSpec::new("sh", vec!["-c".into(), "exit 0".into()]);
    let supervisor = UpstreamSupervisor::launch_with(
        &spec,
        Duration::from_millis(400),
        Duration::from_secs(1),
        EscalationAction::Signal,
        shutdown.subscribe(),
    )
    .unwrap();

    let mut states = supervisor.subscribe();
    states
        .wait_for(|s| matches!(s, ProcessState::Exited { .. }))
        .await
        .unwrap();
    let exited_at = Instant::now();

    assert!(
        tokio::time::timeout(Duration::from_millis(150), sigterm.recv())
            .await
            .is_err(),
        "SIGTERM arrived before the grace period"
    );

    let received = tokio::time::timeout(Duration::from_secs(5), sigterm.recv())
        .await
        .expect("no SIGTERM after the grace period");
    assert_eq!(received, Some(()));
    assert!(exited_at.elapsed() >= Duration::from_millis(350));
    assert_eq!(shutdown.reason(), None);

    supervisor.terminate().await;
}
