use crate::address::Address;
use crate::error::{classify_error, ErrorClass, RoutingError};
use crate::pool::ConnectionPool;
use crate::rediscovery::Rediscovery;
use crate::table::RoutingTable;
use bolt_channel::Channel;
use bolt_connection::{AccessMode, Connection};
use bolt_packstream::Value;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

/// Ties a [`ConnectionPool`] to per-database [`RoutingTable`]s and
/// drives rediscovery, implementing the full algorithm of spec.md
/// §4.I: pick a fresh member by role, or refresh and retry once.
///
/// One `Router` is shared across every session the driver hands out for
/// a routing (as opposed to direct) connection.
pub struct Router<C: Channel> {
    pool: ConnectionPool<C>,
    rediscovery: Rediscovery<C>,
    seeds: Vec<Address>,
    routing_context: IndexMap<String, Value>,
    tables: Mutex<HashMap<String, RoutingTable>>,
}

impl<C: Channel> Router<C> {
    pub fn new(
        pool: ConnectionPool<C>,
        rediscovery: Rediscovery<C>,
        seeds: Vec<Address>,
        routing_context: IndexMap<String, Value>,
    ) -> Self {
        Router { pool, rediscovery, seeds, routing_context, tables: Mutex::new(HashMap::new()) }
    }

    /// Acquire a connection suitable for `role` against `database`
    /// (spec.md §4.I step 1-3): reuse the table if fresh, else refresh
    /// it first. `database` defaults to `"neo4j"` bookkeeping key when
    /// `None` — the wire-level default-database selection is a
    /// `None` passed straight through to the connection layer.
    pub async fn acquire(&self, role: AccessMode, database: Option<&str>) -> Result<(Address, Connection<C>), RoutingError> {
        let key = database.unwrap_or("").to_owned();
        let address = self.pick_or_refresh(role, &key, database).await?;
        match self.pool.acquire(&address).await {
            Ok(conn) => Ok((address, conn)),
            Err(e) => {
                self.forget(&address, &key, &e).await;
                Err(e)
            }
        }
    }

    pub async fn release(&self, address: &Address, connection: Connection<C>) {
        self.pool.release(address, connection).await;
    }

    /// React to a failure observed while using a connection previously
    /// returned by [`Router::acquire`] (spec.md §4.I, §7): an
    /// availability error means the address itself is unreachable, so it
    /// is forgotten from readers and writers alike and its pooled
    /// connections purged; a write failure (e.g. `NotALeader`) means
    /// only that the address is no longer the writer — it is still a
    /// valid reader, so only `forget_writer` applies and its pooled
    /// connections are left alone.
    pub async fn forget(&self, address: &Address, database: &str, error: &RoutingError) {
        match classify_error(error) {
            ErrorClass::Availability => {
                {
                    let mut tables = self.tables.lock().expect("routing tables mutex poisoned");
                    if let Some(table) = tables.get_mut(database) {
                        table.forget(address);
                    }
                }
                self.pool.purge(address).await;
            }
            ErrorClass::WriteFailure => {
                let mut tables = self.tables.lock().expect("routing tables mutex poisoned");
                if let Some(table) = tables.get_mut(database) {
                    table.forget_writer(address);
                }
            }
            _ => {}
        }
    }

    async fn pick_or_refresh(
        &self,
        role: AccessMode,
        key: &str,
        database: Option<&str>,
    ) -> Result<Address, RoutingError> {
        {
            let mut tables = self.tables.lock().expect("routing tables mutex poisoned");
            let table = tables.entry(key.to_owned()).or_insert_with(RoutingTable::empty);
            if !table.is_stale_for(role) {
                if let Some(addr) = table.next(role) {
                    return Ok(addr);
                }
            }
        }

        self.refresh(key, database).await?;

        let mut tables = self.tables.lock().expect("routing tables mutex poisoned");
        let table = tables.get_mut(key).expect("just refreshed");
        table.next(role).ok_or(RoutingError::ServiceUnavailable)
    }

    async fn refresh(&self, key: &str, database: Option<&str>) -> Result<(), RoutingError> {
        let mut working = {
            let tables = self.tables.lock().expect("routing tables mutex poisoned");
            tables.get(key).cloned().unwrap_or_else(RoutingTable::empty)
        };
        let result = self.rediscovery.refresh(&mut working, &self.seeds, &self.routing_context, database).await;
        {
            let mut tables = self.tables.lock().expect("routing tables mutex poisoned");
            tables.insert(key.to_owned(), working);
        }
        if result.is_ok() {
            info!(database = key, "routing table refreshed");
        }
        result
    }
}
