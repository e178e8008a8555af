//! Shutdown coordination for the proxy.

use std::sync::Arc;

use tokio::sync::watch;

/// Why the service is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGTERM/SIGINT or an explicit request from the host.
    Signal,
    /// The supervised upstream died and its grace period ran out.
    UpstreamExited { code: Option<i32> },
    /// The proxy listener failed.
    ServerError,
}

/// Coordinator for graceful shutdown.
///
/// Cloneable handle; every long-running task subscribes to it. The first
/// trigger wins and later ones are ignored. Listeners that subscribe after
/// the trigger still observe it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<Option<ShutdownReason>>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal. Returns false if it was already triggered.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        let fired = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
        if fired {
            tracing::info!(?reason, "Shutdown triggered");
        }
        fired
    }

    /// The reason of the first trigger, if any.
    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half of [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<Option<ShutdownReason>>,
}

impl ShutdownListener {
    /// Wait until shutdown is triggered.
    ///
    /// If every [`Shutdown`] handle is dropped without a trigger, this resolves
    /// with [`ShutdownReason::Signal`].
    pub async fn recv(&mut self) -> ShutdownReason {
        match self.rx.wait_for(Option::is_some).await {
            Ok(reason) => (*reason).unwrap_or(ShutdownReason::Signal),
            Err(_) => ShutdownReason::Signal,
        }
    }

    /// Whether shutdown has already been triggered.
    pub fn is_triggered(&self) -> bool {
        self.rx.borrow().is_some()
    }
}
