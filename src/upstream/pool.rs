//! Upstream connection pool.
//!
//! # Responsibilities
//! - Own the pooled HTTP client used for every proxied exchange
//! - Bound concurrently checked-out exchanges (leases)
//! - Expire idle keep-alive connections
//! - Close at shutdown so late requests fail fast

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::{PoolConfig, TimeoutConfig};
use crate::error::ProxyError;
use crate::observability::metrics;

/// Shared pool of upstream connections. Cheap to clone.
#[derive(Clone)]
pub struct UpstreamPool {
    client: Client<HttpConnector, Body>,
    slots: Arc<Semaphore>,
    max_connections: usize,
}

impl UpstreamPool {
    /// Build the pool from configuration. Created once at startup.
    pub fn new(pool: &PoolConfig, timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(Duration::from_secs(pool.idle_timeout_secs))
            .pool_max_idle_per_host(pool.max_idle)
            .build(connector);

        Self {
            client,
            slots: Arc::new(Semaphore::new(pool.max_connections)),
            max_connections: pool.max_connections,
        }
    }

    /// Check out a slot for one exchange. Waits while the pool is saturated.
    pub async fn checkout(&self) -> Result<PoolLease, ProxyError> {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ProxyError::PoolClosed)?;
        metrics::set_in_flight(self.in_flight());
        Ok(PoolLease {
            _permit: permit,
            slots: Arc::clone(&self.slots),
            max_connections: self.max_connections,
        })
    }

    /// Send one request upstream and wait for the response head.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Incoming>, ProxyError> {
        self.client
            .request(request)
            .await
            .map_err(ProxyError::from_client)
    }

    /// Exchanges currently holding a lease.
    pub fn in_flight(&self) -> usize {
        self.max_connections
            .saturating_sub(self.slots.available_permits())
    }

    /// Refuse further checkouts. Leases already handed out stay valid.
    pub fn close(&self) {
        self.slots.close();
        tracing::info!(in_flight = self.in_flight(), "Upstream pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.slots.is_closed()
    }
}

/// A checked-out pool slot, released on drop.
#[derive(Debug)]
pub struct PoolLease {
    _permit: OwnedSemaphorePermit,
    slots: Arc<Semaphore>,
    max_connections: usize,
}

impl Drop for PoolLease {
    fn drop(&mut self) {
        // The permit is released after this body runs, so count it as gone.
        let in_flight = self
            .max_connections
            .saturating_sub(self.slots.available_permits() + 1);
        metrics::set_in_flight(in_flight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(max: usize) -> UpstreamPool {
        let config = PoolConfig {
            max_connections: max,
            ..PoolConfig::default()
        };
        UpstreamPool::new(&config, &TimeoutConfig::default())
    }

    #[tokio::test]
    async fn leases_are_bounded_and_released() {
        let pool = pool(2);
        let a = pool.checkout().await.unwrap();
        let _b = pool.checkout().await.unwrap();
        assert_eq!(pool.in_flight(), 2);

        let third = tokio::time::timeout(Duration::from_millis(50), pool.checkout()).await;
        assert!(third.is_err(), "third checkout must wait");

        drop(a);
        assert_eq!(pool.in_flight(), 1);
        assert!(pool.checkout().await.is_ok());
    }

    #[tokio::test]
    async fn closed_pool_rejects() {
        let pool = pool(1);
        pool.close();
        assert!(pool.is_closed());
        assert!(matches!(pool.checkout().await, Err(ProxyError::PoolClosed)));
    }
}
