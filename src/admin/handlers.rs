use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::admin::ProbeState;
use crate::supervisor::ProcessState;

#[derive(Serialize)]
pub struct ProbeResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct UpstreamStatus {
    pub version: &'static str,
    pub upstream: String,
    pub ready: bool,
    pub process: ProcessStatus,
    pub in_flight: usize,
}

#[derive(Serialize)]
pub struct ProcessStatus {
    pub supervised: bool,
    pub state: &'static str,
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
}

fn process_state(state: &ProbeState) -> Option<ProcessState> {
    state.process.as_ref().map(|rx| *rx.borrow())
}

/// 200 unless the supervised upstream has exited or been killed.
pub async fn livez(State(state): State<ProbeState>) -> (StatusCode, Json<ProbeResponse>) {
    match process_state(&state) {
        Some(process) if !process.is_alive() => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ProbeResponse { status: process.label() }),
        ),
        _ => (StatusCode::OK, Json(ProbeResponse { status: "alive" })),
    }
}

/// 200 when the upstream health endpoint answers 200, 503 otherwise.
pub async fn readyz(State(state): State<ProbeState>) -> (StatusCode, Json<ProbeResponse>) {
    if state.prober.probe().await {
        (StatusCode::OK, Json(ProbeResponse { status: "ready" }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ProbeResponse { status: "not_ready" }),
        )
    }
}

pub async fn status(State(state): State<ProbeState>) -> Json<UpstreamStatus> {
    let ready = state.prober.probe().await;
    let process = match process_state(&state) {
        Some(process) => ProcessStatus {
            supervised: true,
            state: process.label(),
            pid: process.pid(),
            exit_code: match process {
                ProcessState::Exited { code } => code,
                _ => None,
            },
        },
        None => ProcessStatus {
            supervised: false,
            state: "unsupervised",
            pid: None,
            exit_code: None,
        },
    };

    Json(UpstreamStatus {
        version: env!("CARGO_PKG_VERSION"),
        upstream: state.upstream.to_string(),
        ready,
        process,
        in_flight: state.pool.in_flight(),
    })
}
