use crate::address::{Address, Resolver};
use crate::error::RoutingError;
use crate::pool::Connector;
use crate::table::RoutingTable;
use bolt_channel::Channel;
use bolt_connection::{AccessMode, ConnectionError, Failure, Observer, RunRequest};
use bolt_packstream::Value;
use indexmap::IndexMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

const GET_ROUTING_TABLE: &str = "CALL dbms.cluster.routing.getRoutingTable($context, $database)";
const GET_SERVERS: &str = "CALL dbms.cluster.routing.getServers($context)";

/// Server-side routing-table rediscovery (spec.md §4.I).
///
/// Holds no table of its own — callers pass the table to refresh
/// in-place (so a caller can observe which routers got forgotten even
/// when every seed fails) and the table is only wholesale-replaced on
/// a successful refresh.
pub struct Rediscovery<C: Channel> {
    connector: Arc<dyn Connector<C>>,
    resolver: Arc<dyn Resolver>,
}

impl<C: Channel> Rediscovery<C> {
    pub fn new(connector: Arc<dyn Connector<C>>, resolver: Arc<dyn Resolver>) -> Self {
        Rediscovery { connector, resolver }
    }

    /// Seed routers with `table`'s current routers if any, else resolve
    /// `fallback_seeds` (spec.md §4.I step 2). Iterate in order, probing
    /// each until one yields a usable table. Per the design-note open
    /// question this spec adopts: a plain connection failure to a
    /// router only forgets it from readers/writers (`table.forget`),
    /// not from the router set itself; `forget_router` is reserved for
    /// a router that answers but refuses the routing procedure.
    pub async fn refresh(
        &self,
        table: &mut RoutingTable,
        fallback_seeds: &[Address],
        context: &IndexMap<String, Value>,
        database: Option<&str>,
    ) -> Result<(), RoutingError> {
        let seed_routers = self.seed_routers(table, fallback_seeds).await?;
        if seed_routers.is_empty() {
            return Err(RoutingError::ServiceUnavailable);
        }

        for address in &seed_routers {
            let mut conn = match self.connector.connect(address).await {
                Ok(c) => c,
                Err(e) => {
                    debug!(%address, error = %e, "router unreachable, forgetting from readers/writers only");
                    table.forget(address);
                    continue;
                }
            };

            match call_routing_procedure(&mut conn, context, database).await {
                Ok(new_table) => {
                    conn.close().await;
                    *table = new_table;
                    return Ok(());
                }
                Err(RediscoveryFailure::Abort(e)) => {
                    conn.close().await;
                    return Err(e);
                }
                Err(RediscoveryFailure::RouterRefused(e)) => {
                    warn!(%address, error = %e, "router refused the routing procedure, forgetting it");
                    conn.close().await;
                    table.forget_router(address);
                }
            }
        }

        Err(RoutingError::ServiceUnavailable)
    }

    async fn seed_routers(
        &self,
        table: &RoutingTable,
        fallback_seeds: &[Address],
    ) -> Result<Vec<Address>, RoutingError> {
        if !table.routers().is_empty() {
            return Ok(table.routers().to_vec());
        }
        let mut resolved = Vec::new();
        for seed in fallback_seeds {
            resolved.extend(self.resolver.resolve(seed).await?);
        }
        Ok(resolved)
    }
}

/// Distinguishes the two ways a probed router can fail to yield a table
/// (spec.md §4.I step 2): `Abort` stops rediscovery outright (bad
/// credentials or a server that doesn't expose the procedure at all —
/// retrying another router would not help), `RouterRefused` means only
/// this router is bad and the caller should try the next seed.
enum RediscoveryFailure {
    Abort(RoutingError),
    RouterRefused(RoutingError),
}

async fn call_routing_procedure<C: Channel>(
    conn: &mut bolt_connection::Connection<C>,
    context: &IndexMap<String, Value>,
    database: Option<&str>,
) -> Result<RoutingTable, RediscoveryFailure> {
    if conn.adapter().version().supports_route_message() {
        return call_route_message(conn, context, database).await;
    }
    call_routing_query(conn, context, database).await
}

async fn call_route_message<C: Channel>(
    conn: &mut bolt_connection::Connection<C>,
    context: &IndexMap<String, Value>,
    database: Option<&str>,
) -> Result<RoutingTable, RediscoveryFailure> {
    let message = conn
        .adapter()
        .route(context.clone(), &[], database)
        .map_err(|e| RediscoveryFailure::Abort(e.into()))?;
    let metadata = conn.request(message).await.map_err(classify_request_error)?;
    let rt = match metadata.get("rt").and_then(Value::as_map) {
        Some(inner) => inner.clone(),
        None => metadata,
    };
    parse_routing_table(&rt).map_err(RediscoveryFailure::RouterRefused)
}

async fn call_routing_query<C: Channel>(
    conn: &mut bolt_connection::Connection<C>,
    context: &IndexMap<String, Value>,
    database: Option<&str>,
) -> Result<RoutingTable, RediscoveryFailure> {
    let supports_db = conn.adapter().version().supports_database_selector();
    let statement = if supports_db { GET_ROUTING_TABLE } else { GET_SERVERS };
    let mut parameters = IndexMap::new();
    parameters.insert("context".to_owned(), Value::map(context.clone()));
    if supports_db {
        parameters.insert("database".to_owned(), database.map(Value::from).unwrap_or(Value::Null));
    }

    let run_msg = conn
        .adapter()
        .run(&RunRequest {
            statement,
            parameters,
            bookmarks: &[],
            tx_timeout: None,
            tx_metadata: None,
            mode: AccessMode::Read,
            database: None,
        })
        .map_err(|e| RediscoveryFailure::Abort(e.into()))?;
    let pull_msg = conn.adapter().pull(None, None);

    let (run_observer, run_handle) = bolt_connection::capture_observer();
    let records: Arc<Mutex<Vec<Vec<Value>>>> = Arc::new(Mutex::new(Vec::new()));
    let (pull_observer, pull_handle) = record_collector(records.clone());

    // Flushed one request at a time (rather than pipelined) so the
    // exchange works uniformly whether the peer replies to each message
    // as it arrives or buffers until the whole procedure call lands.
    conn.enqueue(run_msg, run_observer).map_err(classify_request_error)?;
    conn.flush().await.map_err(classify_request_error)?;
    conn.enqueue(pull_msg, Box::new(pull_observer)).map_err(classify_request_error)?;
    conn.flush().await.map_err(classify_request_error)?;
    conn.drain_queue().await.map_err(classify_request_error)?;

    match run_handle.take() {
        Some(Ok(_)) => {}
        Some(Err(f)) => return Err(classify_failure(f)),
        None => return Err(RediscoveryFailure::RouterRefused(RoutingError::ServiceUnavailable)),
    }
    match pull_handle.take() {
        Some(Ok(_)) => {}
        Some(Err(f)) => return Err(classify_failure(f)),
        None => return Err(RediscoveryFailure::RouterRefused(RoutingError::ServiceUnavailable)),
    }

    let records = records.lock().expect("record collector mutex poisoned");
    let record = records.first().ok_or_else(|| {
        RediscoveryFailure::RouterRefused(RoutingError::Configuration(
            "routing procedure returned no rows".to_owned(),
        ))
    })?;
    let mut fields = IndexMap::new();
    fields.insert("ttl".to_owned(), record.first().cloned().unwrap_or(Value::Null));
    fields.insert("servers".to_owned(), record.get(1).cloned().unwrap_or(Value::Null));
    parse_routing_table(&fields).map_err(RediscoveryFailure::RouterRefused)
}

fn classify_request_error(e: ConnectionError) -> RediscoveryFailure {
    match &e {
        ConnectionError::Unauthorized(_) => RediscoveryFailure::Abort(e.into()),
        ConnectionError::Failure(f) if is_procedure_not_found(f) => RediscoveryFailure::Abort(e.into()),
        ConnectionError::Failure(_) => RediscoveryFailure::RouterRefused(e.into()),
        _ => RediscoveryFailure::RouterRefused(e.into()),
    }
}

fn classify_failure(f: Failure) -> RediscoveryFailure {
    if f.code == "Neo.ClientError.Security.Unauthorized" || is_procedure_not_found(&f) {
        RediscoveryFailure::Abort(RoutingError::Configuration(f.to_string()))
    } else {
        RediscoveryFailure::RouterRefused(RoutingError::Failure(f))
    }
}

fn is_procedure_not_found(f: &Failure) -> bool {
    f.code == "Neo.ClientError.Procedure.ProcedureNotFound"
}

fn parse_routing_table(fields: &IndexMap<String, Value>) -> Result<RoutingTable, RoutingError> {
    let ttl_secs = match fields.get("ttl") {
        Some(Value::Integer(n)) => *n,
        _ => return Err(RoutingError::Configuration("routing table reply missing integer 'ttl'".to_owned())),
    };
    let servers = match fields.get("servers") {
        Some(Value::List(list)) => list,
        _ => return Err(RoutingError::Configuration("routing table reply missing 'servers' list".to_owned())),
    };

    let mut routers = Vec::new();
    let mut readers = Vec::new();
    let mut writers = Vec::new();
    for entry in servers {
        let map = entry
            .as_map()
            .ok_or_else(|| RoutingError::Configuration("routing table server entry is not a map".to_owned()))?;
        let role = map.get("role").and_then(Value::as_str).unwrap_or("");
        let addresses = match map.get("addresses") {
            Some(Value::List(list)) => list,
            _ => continue,
        };
        let bucket = match role {
            "ROUTE" => &mut routers,
            "READ" => &mut readers,
            "WRITE" => &mut writers,
            _ => continue,
        };
        for a in addresses {
            if let Some(s) = a.as_str() {
                if let Some(addr) = Address::parse(s) {
                    bucket.push(addr);
                }
            }
        }
    }

    if routers.is_empty() {
        return Err(RoutingError::Configuration("routing table reply has no ROUTE servers".to_owned()));
    }
    if readers.is_empty() {
        return Err(RoutingError::Configuration("routing table reply has no READ servers".to_owned()));
    }

    let ttl = if ttl_secs <= 0 { Duration::ZERO } else { Duration::from_secs(ttl_secs as u64) };
    Ok(RoutingTable::new(routers, readers, writers, ttl))
}

struct RecordCollector {
    records: Arc<Mutex<Vec<Vec<Value>>>>,
    outcome: Arc<Mutex<Option<Result<IndexMap<String, Value>, Failure>>>>,
}

impl Observer for RecordCollector {
    fn on_next(&mut self, record: Vec<Value>) {
        self.records.lock().expect("record collector mutex poisoned").push(record);
    }

    fn on_completed(&mut self, metadata: IndexMap<String, Value>) {
        *self.outcome.lock().expect("record collector mutex poisoned") = Some(Ok(metadata));
    }

    fn on_error(&mut self, error: Failure) {
        *self.outcome.lock().expect("record collector mutex poisoned") = Some(Err(error));
    }
}

struct RecordCollectorHandle(Arc<Mutex<Option<Result<IndexMap<String, Value>, Failure>>>>);

impl RecordCollectorHandle {
    fn take(&self) -> Option<Result<IndexMap<String, Value>, Failure>> {
        self.0.lock().expect("record collector mutex poisoned").take()
    }
}

fn record_collector(records: Arc<Mutex<Vec<Vec<Value>>>>) -> (RecordCollector, RecordCollectorHandle) {
    let outcome = Arc::new(Mutex::new(None));
    (RecordCollector { records, outcome: outcome.clone() }, RecordCollectorHandle(outcome))
}
