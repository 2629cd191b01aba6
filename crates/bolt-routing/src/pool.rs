use crate::address::Address;
use crate::error::RoutingError;
use async_trait::async_trait;
use bolt_channel::Channel;
use bolt_connection::Connection;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Produces a freshly authenticated [`Connection`] to `address`. The
/// connector owns the channel-construction details (TCP vs WebSocket,
/// TLS trust strategy, hello options) that the pool itself has no
/// opinion on (spec.md §4.H).
#[async_trait]
pub trait Connector<C: Channel>: Send + Sync {
    async fn connect(&self, address: &Address) -> Result<Connection<C>, RoutingError>;
}

/// A per-address bounded LIFO of idle connections (spec.md §3
/// ConnectionPool, §4.H). Acquisition pops the most recently released
/// idle connection, validating it is still open; on miss (or an empty
/// stack) it creates a new one via the [`Connector`] up to
/// `max_connection_pool_size` connections outstanding per address.
/// Broken connections are never returned to the pool and are dropped
/// (closed) instead of pushed back.
pub struct ConnectionPool<C: Channel> {
    connector: Arc<dyn Connector<C>>,
    idle: Mutex<HashMap<Address, Vec<Connection<C>>>>,
    outstanding: Mutex<HashMap<Address, usize>>,
    max_per_address: usize,
    max_lifetime: Option<Duration>,
}

impl<C: Channel> ConnectionPool<C> {
    pub fn new(connector: Arc<dyn Connector<C>>, max_per_address: usize, max_lifetime: Option<Duration>) -> Self {
        ConnectionPool {
            connector,
            idle: Mutex::new(HashMap::new()),
            outstanding: Mutex::new(HashMap::new()),
            max_per_address,
            max_lifetime,
        }
    }

    /// Acquire a connection to `address`: reuse an idle, still-open,
    /// not-yet-expired one if available, else create a new one subject
    /// to the per-address cap.
    pub async fn acquire(&self, address: &Address) -> Result<Connection<C>, RoutingError> {
        {
            let mut idle = self.idle.lock().await;
            if let Some(stack) = idle.get_mut(address) {
                while let Some(connection) = stack.pop() {
                    if !connection.is_open() {
                        self.dec_outstanding(address).await;
                        continue;
                    }
                    if let Some(max_lifetime) = self.max_lifetime {
                        if connection.created_at().elapsed() >= max_lifetime {
                            debug!(%address, "evicting idle connection past max lifetime");
                            self.dec_outstanding(address).await;
                            continue;
                        }
                    }
                    return Ok(connection);
                }
            }
        }

        {
            let mut outstanding = self.outstanding.lock().await;
            let count = outstanding.entry(address.clone()).or_insert(0);
            if *count >= self.max_per_address {
                return Err(RoutingError::PoolExhausted {
                    address: address.to_string(),
                    max: self.max_per_address,
                });
            }
            *count += 1;
        }

        match self.connector.connect(address).await {
            Ok(conn) => Ok(conn),
            Err(e) => {
                self.dec_outstanding(address).await;
                Err(e)
            }
        }
    }

    /// Return a connection after use. A connection that is no longer
    /// open is dropped (and its outstanding-count slot freed) rather
    /// than pooled (spec.md §3: "Closed/broken connections are never
    /// returned to the pool").
    pub async fn release(&self, address: &Address, mut connection: Connection<C>) {
        if !connection.is_open() {
            connection.close().await;
            self.dec_outstanding(address).await;
            return;
        }
        let mut idle = self.idle.lock().await;
        idle.entry(address.clone()).or_default().push(connection);
    }

    /// Drop every idle connection for `address` and stop counting it as
    /// outstanding capacity — called when the routing layer forgets an
    /// address after a connection or availability failure.
    pub async fn purge(&self, address: &Address) {
        let drained = {
            let mut idle = self.idle.lock().await;
            idle.remove(address).unwrap_or_default()
        };
        for mut connection in drained {
            connection.close().await;
        }
        self.outstanding.lock().await.remove(address);
        warn!(%address, "purged pooled connections after forget");
    }

    async fn dec_outstanding(&self, address: &Address) {
        let mut outstanding = self.outstanding.lock().await;
        if let Some(count) = outstanding.get_mut(address) {
            *count = count.saturating_sub(1);
        }
    }
}
