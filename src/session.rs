use crate::driver::Backend;
use crate::error::Error;
use bolt_channel::Channel;
use bolt_connection::{
    capture_observer, AccessMode, Connection, ConnectionError, Failure, Observer, RunRequest, TxExtra,
};
use bolt_packstream::Value;
use bolt_routing::{Address, RoutingError};
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A borrowed-connection session (spec.md §3 Session, §4.J): the unit a
/// caller actually runs queries and transactions against. One connection
/// is held for the session's whole lifetime (acquired lazily, on first
/// use), never shared with another session concurrently.
///
/// Auto-commit results are materialised eagerly (spec.md §4.G `PULL{n:
/// -1}` pulled in full on every protocol version, not batched via `n`) —
/// see [`RecordStream`] for why this keeps the session's wire state
/// simple without giving up a lazy Rust-side iteration API.
pub struct Session<C: Channel> {
    backend: Arc<dyn Backend<C>>,
    mode: AccessMode,
    database: Option<String>,
    bookmarks: crate::Bookmarks,
    address: Option<Address>,
    connection: Option<Connection<C>>,
    tx_open: bool,
}

impl<C: Channel> Session<C> {
    pub(crate) fn new(
        backend: Arc<dyn Backend<C>>,
        mode: AccessMode,
        database: Option<String>,
        bookmarks: crate::Bookmarks,
    ) -> Self {
        Session { backend, mode, database, bookmarks, address: None, connection: None, tx_open: false }
    }

    pub fn bookmarks(&self) -> &crate::Bookmarks {
        &self.bookmarks
    }

    /// Run one auto-commit statement (spec.md §4.G auto-commit `RUN` +
    /// `PULL`). Fails with [`Error::TransactionAlreadyOpen`] while an
    /// explicit transaction is open on this session — the two forms of
    /// query are never interleaved (spec.md §4.J).
    pub async fn run(&mut self, statement: &str, parameters: IndexMap<String, Value>) -> Result<RecordStream, Error> {
        if self.tx_open {
            return Err(Error::TransactionAlreadyOpen);
        }
        self.run_and_pull(statement, parameters).await
    }

    /// Begin an explicit transaction (spec.md §4.G `BEGIN` / V1-V2
    /// `RUN("BEGIN")` + `PULL_ALL`). Only one may be open per session at
    /// a time.
    pub async fn begin_transaction(&mut self) -> Result<Transaction<'_, C>, Error> {
        if self.tx_open {
            return Err(Error::TransactionAlreadyOpen);
        }
        self.ensure_connection().await?;
        let mut conn = self.connection.take().expect("ensure_connection sets this");
        let bookmarks = self.bookmarks.to_vec();
        let result = exchange_tx_begin(&mut conn, self.mode, self.database.as_deref(), &bookmarks).await;
        self.complete_exchange(conn, result).await?;
        self.tx_open = true;
        Ok(Transaction { session: self })
    }

    /// Release the held connection back to the pool/router (spec.md §3:
    /// a session's connection is reusable by the next session once this
    /// one is done with it).
    pub async fn close(mut self) {
        if let (Some(address), Some(connection)) = (self.address.take(), self.connection.take()) {
            self.backend.release(&address, connection).await;
        }
    }

    async fn run_and_pull(&mut self, statement: &str, parameters: IndexMap<String, Value>) -> Result<RecordStream, Error> {
        self.ensure_connection().await?;
        let mut conn = self.connection.take().expect("ensure_connection sets this");
        let bookmarks = self.bookmarks.to_vec();
        let result =
            exchange_run_pull(&mut conn, statement, parameters, &bookmarks, self.mode, self.database.as_deref()).await;
        self.complete_exchange(conn, result).await
    }

    /// Run one statement inside the already-open explicit transaction
    /// (spec.md §4.G, §4.J). Unlike [`Session::run_and_pull`]'s
    /// auto-commit `RUN`, this one carries no `bookmarks`/`mode`/tx
    /// fields of its own — `BEGIN` already established them for the
    /// whole transaction, and a V3+ server rejects a `RUN` whose extra
    /// map repeats them mid-transaction.
    async fn run_in_transaction(&mut self, statement: &str, parameters: IndexMap<String, Value>) -> Result<RecordStream, Error> {
        let mut conn = self.connection.take().ok_or(Error::DriverClosed)?;
        let result = exchange_run_in_transaction(&mut conn, statement, parameters).await;
        self.complete_exchange(conn, result).await
    }

    async fn finish_transaction(&mut self, commit: bool) -> Result<(), Error> {
        let mut conn = self.connection.take().ok_or(Error::DriverClosed)?;
        let result = exchange_tx_boundary(&mut conn, commit).await;
        let result = self.complete_exchange(conn, result).await;
        self.tx_open = false;
        if commit {
            if let Ok(metadata) = &result {
                self.adopt_bookmark(metadata);
            }
        }
        result.map(|_| ())
    }

    async fn ensure_connection(&mut self) -> Result<(), Error> {
        if self.connection.is_some() {
            return Ok(());
        }
        let (address, connection) = self.backend.acquire(self.mode, self.database.as_deref()).await?;
        self.address = Some(address);
        self.connection = Some(connection);
        Ok(())
    }

    /// Reconcile the outcome of one exchange with this session's held
    /// connection and the backend's bookkeeping (spec.md §4.H/§4.I/§7):
    /// a connection that broke is closed and its address forgotten; one
    /// that merely reported a business-level failure (e.g. a cluster
    /// write rejection) stays in the session but is still reported to the
    /// backend so routing/pool state reacts to it.
    async fn complete_exchange<T>(&mut self, mut conn: Connection<C>, result: Result<T, Error>) -> Result<T, Error> {
        let broken = !conn.is_open();
        if broken {
            conn.close().await;
        }
        if let Some(address) = &self.address {
            if let Some(routing_err) = error_to_routing(&result) {
                self.backend.forget(address, self.database.as_deref().unwrap_or(""), &routing_err).await;
            }
        }
        if broken {
            self.address = None;
        } else {
            self.connection = Some(conn);
        }
        result
    }

    fn adopt_bookmark(&mut self, metadata: &IndexMap<String, Value>) {
        if let Some(bookmark) = metadata.get("bookmark").and_then(Value::as_str) {
            self.bookmarks.insert(bookmark.to_owned());
        }
    }
}

fn error_to_routing<T>(result: &Result<T, Error>) -> Option<RoutingError> {
    match result {
        Err(Error::Connection(e)) => Some(RoutingError::Connection(e.clone())),
        Err(Error::Routing(e)) => Some(e.clone()),
        _ => None,
    }
}

fn conn_adapter<C: Channel>(conn: &Connection<C>) -> bolt_connection::Adapter {
    *conn.adapter()
}

async fn exchange_run_pull<C: Channel>(
    conn: &mut Connection<C>,
    statement: &str,
    parameters: IndexMap<String, Value>,
    bookmarks: &[String],
    mode: AccessMode,
    database: Option<&str>,
) -> Result<RecordStream, Error> {
    let adapter = conn_adapter(conn);
    let run_req =
        RunRequest { statement, parameters, bookmarks, tx_timeout: None, tx_metadata: None, mode, database };
    let run_msg = adapter.run(&run_req)?;
    run_and_collect(conn, &adapter, run_msg).await
}

/// The in-transaction `RUN` (spec.md §4.G, §4.J): `BEGIN` already carried
/// `bookmarks`/`mode`/tx fields for the whole transaction, so this `RUN`'s
/// extra map stays empty — `adapter.run_in_transaction` never fills it,
/// unlike `adapter.run`'s auto-commit encoding.
async fn exchange_run_in_transaction<C: Channel>(
    conn: &mut Connection<C>,
    statement: &str,
    parameters: IndexMap<String, Value>,
) -> Result<RecordStream, Error> {
    let adapter = conn_adapter(conn);
    let run_msg = adapter.run_in_transaction(statement, parameters);
    run_and_collect(conn, &adapter, run_msg).await
}

/// Enqueue an already-encoded `RUN` alongside its `PULL`, drain both, and
/// materialise the resulting [`RecordStream`] (spec.md §4.G auto-commit
/// and in-transaction `RUN` share everything past message encoding).
async fn run_and_collect<C: Channel>(
    conn: &mut Connection<C>,
    adapter: &bolt_connection::Adapter,
    run_msg: Value,
) -> Result<RecordStream, Error> {
    let pull_msg = adapter.pull(None, None);

    let (keys_observer, keys_handle) = capture_observer();
    conn.enqueue(run_msg, keys_observer)?;

    let buffer = Arc::new(Mutex::new(VecDeque::new()));
    let outcome_slot = Arc::new(Mutex::new(None));
    conn.enqueue(pull_msg, Box::new(StreamObserver { buffer: buffer.clone(), outcome: outcome_slot.clone() }))?;

    conn.flush().await?;
    conn.drain_queue().await?;

    let keys = match keys_handle.take() {
        Some(Ok(metadata)) => extract_keys(&metadata),
        Some(Err(failure)) => return Err(ConnectionError::Failure(failure).into()),
        None => return Err(Error::DriverClosed),
    };
    let records = buffer.lock().expect("stream buffer mutex poisoned").drain(..).collect();
    let metadata = match outcome_slot.lock().expect("stream outcome mutex poisoned").take() {
        Some(Ok(metadata)) => metadata,
        Some(Err(failure)) => return Err(ConnectionError::Failure(failure).into()),
        None => IndexMap::new(),
    };
    Ok(RecordStream { keys: Arc::new(keys), records, metadata })
}

async fn exchange_tx_begin<C: Channel>(
    conn: &mut Connection<C>,
    mode: AccessMode,
    database: Option<&str>,
    bookmarks: &[String],
) -> Result<(), Error> {
    let adapter = conn_adapter(conn);
    let tx = TxExtra { bookmarks, tx_timeout: None, tx_metadata: None, mode, database };
    let requests = adapter.begin(&tx)?;
    for req in requests {
        conn.request(req.message).await?;
        if req.needs_pull {
            conn.request(adapter.pull(None, None)).await?;
        }
    }
    Ok(())
}

async fn exchange_tx_boundary<C: Channel>(conn: &mut Connection<C>, commit: bool) -> Result<IndexMap<String, Value>, Error> {
    let adapter = conn_adapter(conn);
    let requests = if commit { adapter.commit() } else { adapter.rollback() };
    let mut last_metadata = IndexMap::new();
    for req in requests {
        last_metadata = conn.request(req.message).await?;
        if req.needs_pull {
            last_metadata = conn.request(adapter.pull(None, None)).await?;
        }
    }
    Ok(last_metadata)
}

fn extract_keys(metadata: &IndexMap<String, Value>) -> Vec<String> {
    metadata
        .get("fields")
        .and_then(Value::as_list)
        .map(|fields| fields.iter().filter_map(Value::as_str).map(str::to_owned).collect())
        .unwrap_or_default()
}

/// Collects the RECORD stream and terminal outcome of one `PULL`
/// exchange into shared slots a synchronous caller can read back once
/// the exchange has fully drained (spec.md §3 Observer, pattern shared
/// with [`bolt_connection::capture_observer`]).
struct StreamObserver {
    buffer: Arc<Mutex<VecDeque<Vec<Value>>>>,
    outcome: Arc<Mutex<Option<Result<IndexMap<String, Value>, Failure>>>>,
}

impl Observer for StreamObserver {
    fn on_next(&mut self, record: Vec<Value>) {
        self.buffer.lock().expect("stream buffer mutex poisoned").push_back(record);
    }

    fn on_completed(&mut self, metadata: IndexMap<String, Value>) {
        *self.outcome.lock().expect("stream outcome mutex poisoned") = Some(Ok(metadata));
    }

    fn on_error(&mut self, error: Failure) {
        *self.outcome.lock().expect("stream outcome mutex poisoned") = Some(Err(error));
    }
}

/// The already-materialised result of one query (spec.md §4.G): field
/// names plus every row, in arrival order. Iterate it directly —
/// `for record in stream { ... }` — rather than polling record-by-record
/// off the wire, since this driver always issues `PULL{n: -1}` and waits
/// for the whole result before returning it.
pub struct RecordStream {
    keys: Arc<Vec<String>>,
    records: VecDeque<Vec<Value>>,
    metadata: IndexMap<String, Value>,
}

impl RecordStream {
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// The terminal `SUCCESS` metadata (`bookmark`, `result_available_after`,
    /// `result_consumed_after`, ...; spec.md §4.G normalises the legacy
    /// `t_first`/`t_last` names into these on V3+).
    pub fn metadata(&self) -> &IndexMap<String, Value> {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Iterator for RecordStream {
    type Item = Vec<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.pop_front()
    }
}

/// An explicit transaction (spec.md §4.G `BEGIN`/`COMMIT`/`ROLLBACK`):
/// borrows its session for as long as it's open, so the compiler itself
/// enforces "one transaction at a time" in addition to the runtime
/// [`Error::TransactionAlreadyOpen`] check.
pub struct Transaction<'s, C: Channel> {
    session: &'s mut Session<C>,
}

impl<'s, C: Channel> Transaction<'s, C> {
    pub async fn run(&mut self, statement: &str, parameters: IndexMap<String, Value>) -> Result<RecordStream, Error> {
        self.session.run_in_transaction(statement, parameters).await
    }

    pub async fn commit(self) -> Result<(), Error> {
        self.session.finish_transaction(true).await
    }

    pub async fn rollback(self) -> Result<(), Error> {
        self.session.finish_transaction(false).await
    }
}
