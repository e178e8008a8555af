//! Streaming relay of upstream response bodies.
//!
//! # Responsibilities
//! - Pull body frames from the upstream only as fast as the client reads them
//! - Enforce the idle read timeout between upstream frames
//! - Log and truncate when the upstream stream breaks after headers were sent
//! - Release the pool lease when the stream ends, fails, or is dropped
//!
//! # Design Decisions
//! - No buffering: each upstream frame is handed to the server as-is
//! - Errors after the status line cannot change the status; the body simply ends
//! - A dropped body (client went away) drops the upstream body with it, which
//!   closes that upstream connection instead of draining it

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::BoxError;
use hyper::body::{Body, Bytes, Frame, Incoming, SizeHint};
use tokio::time::{Instant, Sleep};

use crate::http::request::RequestId;
use crate::observability::metrics;
use crate::upstream::PoolLease;

/// How a relayed stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Upstream sent its final frame.
    Complete,
    /// Upstream errored mid-stream; the client saw a truncated body.
    Interrupted,
    /// Upstream went silent for longer than the idle timeout.
    IdleTimeout,
    /// The client stopped reading before the end.
    Cancelled,
}

impl StreamOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamOutcome::Complete => "complete",
            StreamOutcome::Interrupted => "interrupted",
            StreamOutcome::IdleTimeout => "idle_timeout",
            StreamOutcome::Cancelled => "cancelled",
        }
    }
}

/// Stand-in deadline when `now + read_idle` is not representable.
const NO_IDLE_DEADLINE: Duration = Duration::from_secs(86400 * 365 * 30);

fn idle_deadline(read_idle: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(read_idle)
        .unwrap_or(now + NO_IDLE_DEADLINE)
}

/// Response body relaying an upstream body frame by frame.
pub struct RelayBody<B: Body = Incoming> {
    inner: Pin<Box<B>>,
    idle: Pin<Box<Sleep>>,
    read_idle: Duration,
    request_id: RequestId,
    bytes: u64,
    outcome: Option<StreamOutcome>,
    lease: Option<PoolLease>,
}

impl<B> RelayBody<B>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    /// Wrap an upstream body. Must be called inside a Tokio runtime.
    pub fn new(inner: B, read_idle: Duration, request_id: RequestId) -> Self {
        Self {
            inner: Box::pin(inner),
            idle: Box::pin(tokio::time::sleep_until(idle_deadline(read_idle))),
            read_idle,
            request_id,
            bytes: 0,
            outcome: None,
            lease: None,
        }
    }

    /// Hold a pool lease until the stream is done.
    pub fn with_lease(mut self, lease: PoolLease) -> Self {
        self.lease = Some(lease);
        self
    }

    /// Bytes relayed so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    fn finish(&mut self, outcome: StreamOutcome) {
        self.outcome = Some(outcome);
        self.lease = None;
        metrics::record_stream(outcome.as_str(), self.bytes);
    }
}

impl<B> Body for RelayBody<B>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        if this.outcome.is_some() {
            return Poll::Ready(None);
        }

        match this.inner.as_mut().poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.bytes += data.len() as u64;
                }
                this.idle.as_mut().reset(idle_deadline(this.read_idle));
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(e))) => {
                let e: BoxError = e.into();
                tracing::warn!(
                    request_id = %this.request_id,
                    bytes = this.bytes,
                    error = %e,
                    "Upstream stream interrupted, response truncated"
                );
                this.finish(StreamOutcome::Interrupted);
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                tracing::debug!(
                    request_id = %this.request_id,
                    bytes = this.bytes,
                    "Upstream stream complete"
                );
                this.finish(StreamOutcome::Complete);
                Poll::Ready(None)
            }
            Poll::Pending => {
                if this.idle.as_mut().poll(cx).is_ready() {
                    tracing::warn!(
                        request_id = %this.request_id,
                        bytes = this.bytes,
                        idle_secs = this.read_idle.as_secs_f64(),
                        "Upstream idle timeout, response truncated"
                    );
                    this.finish(StreamOutcome::IdleTimeout);
                    let err = io::Error::new(io::ErrorKind::TimedOut, "upstream read idle timeout");
                    return Poll::Ready(Some(Err(err.into())));
                }
                Poll::Pending
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.outcome.is_some() || self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl<B: Body> Drop for RelayBody<B> {
    fn drop(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        // HEAD responses and empty bodies are never polled.
        let outcome = if self.inner.is_end_stream() {
            StreamOutcome::Complete
        } else {
            tracing::debug!(
                request_id = %self.request_id,
                bytes = self.bytes,
                "Client went away mid-stream, closing upstream connection"
            );
            StreamOutcome::Cancelled
        };
        metrics::record_stream(outcome.as_str(), self.bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body as AxumBody;

    #[tokio::test]
    async fn relays_every_byte() {
        let payload = vec![7u8; 256 * 1024];
        let body = RelayBody::new(
            AxumBody::from(payload.clone()),
            Duration::from_secs(5),
            RequestId::generate(),
        );
        let collected = axum::body::to_bytes(AxumBody::new(body), usize::MAX)
            .await
            .unwrap();
        assert_eq!(collected.as_ref(), payload.as_slice());
    }

    #[tokio::test]
    async fn idle_upstream_truncates() {
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, io::Error>>(1);
        tx.send(Ok(Bytes::from_static(b"first"))).await.unwrap();
        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        let body = RelayBody::new(
            AxumBody::from_stream(stream),
            Duration::from_millis(100),
            RequestId::generate(),
        );

        let result = axum::body::to_bytes(AxumBody::new(body), usize::MAX).await;
        assert!(result.is_err());
        drop(tx);
    }

    #[tokio::test]
    async fn huge_idle_timeout_does_not_overflow() {
        let payload = vec![1u8; 16];
        let body = RelayBody::new(
            AxumBody::from(payload.clone()),
            Duration::from_secs(u64::MAX),
            RequestId::generate(),
        );
        let collected = axum::body::to_bytes(AxumBody::new(body), usize::MAX)
            .await
            .unwrap();
        assert_eq!(collected.as_ref(), payload.as_slice());
    }

    #[tokio::test]
    async fn empty_body_ends_immediately() {
        let body = RelayBody::new(
            AxumBody::empty(),
            Duration::from_secs(1),
            RequestId::generate(),
        );
        assert!(body.is_end_stream());
        assert_eq!(body.bytes(), 0);
    }
}
