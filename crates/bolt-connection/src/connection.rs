use crate::adapters::{Adapter, HelloOptions};
use crate::error::ConnectionError;
use crate::failure::Failure;
use crate::observer::{capture_observer, BoxObserver, CaptureHandle};
use crate::version::ProtocolVersion;
use bolt_channel::Channel;
use bolt_chunking::{Chunker, Dechunker};
use bolt_packstream::{DecodingError, Packer, StructMapperRegistry, Unpacker, Value};
use bytes::BytesMut;
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The magic preamble written before the four version proposals
/// (spec.md §4.F, §6).
const MAGIC_PREAMBLE: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// Externally-observable connection state (spec.md §4.F). The
/// transient `Start`/`Handshaking`/`Negotiated`/`Authenticating` states
/// only exist inside [`Connection::connect`] — by the time a
/// `Connection` value exists for a caller to hold, it is already past
/// authentication and sits in `Ready` or, the instant a request is
/// pipelined, `Streaming`.
#[derive(Debug)]
enum State {
    Ready,
    Streaming,
    Failed(ConnectionError),
    Closed,
}

struct QueueEntry {
    observer: BoxObserver,
    is_ack: bool,
}

/// The per-connection state machine (spec.md §4.F): owns the channel,
/// the chunker/dechunker pair, the struct-aware unpacker, the
/// version-specific [`Adapter`], and the FIFO queue of observers
/// awaiting a response. All methods that can only make progress with
/// I/O are `async`; everything else (building messages via `adapter()`,
/// inspecting state) is synchronous.
pub struct Connection<C: Channel> {
    channel: C,
    chunker: Chunker,
    dechunker: Dechunker,
    unpacker: Unpacker,
    adapter: Adapter,
    observers: VecDeque<QueueEntry>,
    state: State,
    acking_failure: bool,
    pending_failure: Option<Failure>,
    created_at: Instant,
}

impl<C: Channel> Connection<C> {
    /// Perform the magic-preamble/version handshake and authenticate
    /// (spec.md §4.F). Returns a connection in `Ready` state, or the
    /// classified error (most commonly [`ConnectionError::WrongEndpoint`]
    /// or [`ConnectionError::Unauthorized`]) otherwise.
    pub async fn connect(mut channel: C, hello: HelloOptions<'_>) -> Result<Self, ConnectionError> {
        let mut proposal = BytesMut::with_capacity(20);
        proposal.extend_from_slice(&MAGIC_PREAMBLE);
        for v in ProtocolVersion::PROPOSALS {
            proposal.extend_from_slice(&v.encode_proposal());
        }
        channel.send(proposal.freeze()).await?;

        let mut reply_buf = BytesMut::new();
        while reply_buf.len() < 4 {
            match channel.recv().await? {
                Some(chunk) => reply_buf.extend_from_slice(&chunk),
                None => {
                    return Err(ConnectionError::Channel(
                        "channel closed during handshake".to_owned(),
                    ))
                }
            }
        }
        let reply = u32::from_be_bytes(reply_buf[0..4].try_into().unwrap());
        let leftover = reply_buf.split_off(4);
        let version = ProtocolVersion::decode(reply)?;
        debug!(%version, "handshake negotiated");

        let mut unpacker = Unpacker::with_struct_mappers(StructMapperRegistry::new());
        register_struct_mappers(&mut unpacker);

        let mut conn = Connection {
            channel,
            chunker: Chunker::new(),
            dechunker: Dechunker::new(),
            unpacker,
            adapter: Adapter::for_version(version),
            observers: VecDeque::new(),
            state: State::Ready,
            acking_failure: false,
            pending_failure: None,
            created_at: Instant::now(),
        };
        if !leftover.is_empty() {
            conn.dechunker.feed(leftover.freeze())?;
        }

        let hello_msg = conn.adapter.hello(&hello)?;
        let metadata = conn.request(hello_msg).await.map_err(|e| match e {
            ConnectionError::Failure(f) => ConnectionError::Unauthorized(f.message),
            other => other,
        })?;
        info!(%version, ?metadata, "session established");
        Ok(conn)
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.adapter.version()
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// A cheap, syscall-free liveness check (spec.md's supplemented
    /// "connection liveness probe", SPEC_FULL §2): `false` once the
    /// connection is fatally broken or closed.
    pub fn is_open(&self) -> bool {
        !matches!(self.state, State::Failed(_) | State::Closed)
    }

    pub fn is_encrypted(&self) -> bool {
        self.channel.is_encrypted()
    }

    /// When the handshake/auth exchange that produced this connection
    /// completed — fixed at construction, not at any later checkout or
    /// release, so a pool's idle-eviction-by-age (spec.md §4.H
    /// `max_connection_lifetime_ms`) measures the connection's actual
    /// age rather than time-since-last-release.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Write one message into the chunker and queue its observer,
    /// without touching the wire yet — callers pipeline several of
    /// these (e.g. RUN + PULL) before a single [`Connection::flush`]
    /// (spec.md §5).
    pub fn enqueue(&mut self, message: Value, observer: BoxObserver) -> Result<(), ConnectionError> {
        if let State::Failed(e) = &self.state {
            return Err(e.clone());
        }
        if matches!(self.state, State::Closed) {
            return Err(ConnectionError::Closed);
        }
        Packer::new(&mut self.chunker).pack(&message)?;
        self.chunker.message_boundary()?;
        self.observers.push_back(QueueEntry { observer, is_ack: false });
        self.state = State::Streaming;
        Ok(())
    }

    /// Drain the chunker's accumulated bytes to the channel.
    pub async fn flush(&mut self) -> Result<(), ConnectionError> {
        let bytes = self.chunker.flush()?;
        if !bytes.is_empty() {
            self.channel.send(bytes).await?;
        }
        Ok(())
    }

    /// Enqueue, flush, and wait for exactly this message's terminator.
    /// Correct even with other requests already pipelined ahead of it,
    /// since [`Connection::drain_queue`] simply waits for the whole
    /// queue (this message's observer included) to empty.
    pub async fn request(&mut self, message: Value) -> Result<IndexMap<String, Value>, ConnectionError> {
        let (observer, handle) = capture_observer();
        self.enqueue(message, observer)?;
        self.flush().await?;
        self.drain_queue().await?;
        Self::resolve(&handle, &self.adapter)
    }

    fn resolve(handle: &CaptureHandle, adapter: &Adapter) -> Result<IndexMap<String, Value>, ConnectionError> {
        match handle.take() {
            Some(Ok(metadata)) => Ok(adapter.normalize_metadata(metadata)),
            Some(Err(failure)) => Err(ConnectionError::Failure(failure)),
            None => Err(ConnectionError::Closed),
        }
    }

    /// Read and dispatch responses until the observer queue is empty.
    pub async fn drain_queue(&mut self) -> Result<(), ConnectionError> {
        while !self.observers.is_empty() {
            self.poll_one().await?;
        }
        Ok(())
    }

    /// Read one chunk of bytes off the channel and dispatch every
    /// message it completes. Returns the number of messages dispatched
    /// (zero if the chunk only advanced a partial message).
    pub async fn poll_one(&mut self) -> Result<usize, ConnectionError> {
        if let State::Failed(e) = &self.state {
            return Err(e.clone());
        }
        let chunk = match self.channel.recv().await {
            Ok(Some(c)) => c,
            Ok(None) => {
                let err = ConnectionError::Channel("connection closed by peer".to_owned());
                self.fail(err.clone());
                return Err(err);
            }
            Err(e) => {
                let err: ConnectionError = e.into();
                self.fail(err.clone());
                return Err(err);
            }
        };
        if let Err(e) = self.dechunker.feed(chunk) {
            let err: ConnectionError = e.into();
            self.fail(err.clone());
            return Err(err);
        }

        let mut dispatched = 0;
        loop {
            let mut msg = match self.dechunker.next_message() {
                Some(m) => m,
                None => break,
            };
            let value = match self.unpacker.unpack(&mut msg) {
                Ok(v) => v,
                Err(e) => {
                    let err: ConnectionError = e.into();
                    self.fail(err.clone());
                    return Err(err);
                }
            };
            if let Err(e) = self.dispatch(value).await {
                self.fail(e.clone());
                return Err(e);
            }
            dispatched += 1;
        }
        Ok(dispatched)
    }

    async fn dispatch(&mut self, value: Value) -> Result<(), ConnectionError> {
        let s = match value {
            Value::Structure(s) => s,
            _ => return Err(ConnectionError::Decoding(DecodingError::UnmappedStruct(0))),
        };
        match s.signature {
            crate::signatures::RECORD => {
                let record = match s.fields.into_iter().next() {
                    Some(Value::List(items)) => items,
                    _ => Vec::new(),
                };
                if let Some(entry) = self.observers.front_mut() {
                    entry.observer.on_next(record);
                }
            }
            crate::signatures::SUCCESS => {
                let metadata = extract_metadata(s.fields);
                let metadata = self.adapter.normalize_metadata(metadata);
                if let Some(mut entry) = self.observers.pop_front() {
                    let was_ack = entry.is_ack;
                    entry.observer.on_completed(metadata);
                    if was_ack {
                        self.acking_failure = false;
                        self.pending_failure = None;
                    }
                }
                self.settle_state();
            }
            crate::signatures::FAILURE => {
                let metadata = extract_metadata(s.fields);
                let failure = Failure::from_metadata(&metadata);
                if let Some(mut entry) = self.observers.pop_front() {
                    entry.observer.on_error(failure.clone());
                }
                self.settle_state();
                self.acknowledge_failure(failure).await?;
            }
            crate::signatures::IGNORED => {
                let metadata = extract_metadata(s.fields);
                if let Some(mut entry) = self.observers.pop_front() {
                    let reported = if self.acking_failure {
                        self.pending_failure.clone().unwrap_or_else(|| Failure::from_metadata(&metadata))
                    } else {
                        Failure::from_metadata(&metadata)
                    };
                    entry.observer.on_error(reported);
                }
                self.settle_state();
            }
            other => {
                warn!(signature = format!("0x{other:02x}"), "unrecognised response signature");
            }
        }
        Ok(())
    }

    /// Send exactly one acknowledgement (`ack_failure` pre-V3, `reset`
    /// V3+) in reaction to a FAILURE, suppressing further acks until it
    /// completes (spec.md §4.F).
    async fn acknowledge_failure(&mut self, failure: Failure) -> Result<(), ConnectionError> {
        if self.acking_failure {
            return Ok(());
        }
        self.acking_failure = true;
        self.pending_failure = Some(failure);
        let ack_message = self.adapter.ack_failure().unwrap_or_else(|| self.adapter.reset());
        Packer::new(&mut self.chunker).pack(&ack_message)?;
        self.chunker.message_boundary()?;
        self.observers.push_back(QueueEntry { observer: Box::new(crate::observer::AckObserver), is_ack: true });
        self.state = State::Streaming;
        self.flush().await
    }

    fn settle_state(&mut self) {
        if matches!(self.state, State::Failed(_) | State::Closed) {
            return;
        }
        self.state = if self.observers.is_empty() { State::Ready } else { State::Streaming };
    }

    /// Mark the connection fatally broken: error every queued observer
    /// with `err` and refuse all further I/O (spec.md §4.F, §7). Idempotent.
    fn fail(&mut self, err: ConnectionError) {
        if matches!(self.state, State::Failed(_) | State::Closed) {
            return;
        }
        let failure = Failure { code: err.code().to_owned(), message: err.to_string() };
        while let Some(mut entry) = self.observers.pop_front() {
            entry.observer.on_error(failure.clone());
        }
        self.state = State::Failed(err);
    }

    /// Close protocol (spec.md §4.F): send `goodbye` first if the
    /// connection is healthy and V3+, then shut down the socket. A
    /// broken connection never sends goodbye.
    pub async fn close(&mut self) {
        if matches!(self.state, State::Ready | State::Streaming) {
            if let Some(goodbye) = self.adapter.goodbye() {
                let framed = Packer::new(&mut self.chunker)
                    .pack(&goodbye)
                    .is_ok()
                    && self.chunker.message_boundary().is_ok();
                if framed {
                    let _ = self.flush().await;
                }
            }
        }
        let _ = self.channel.close().await;
        self.state = State::Closed;
    }
}

fn extract_metadata(fields: Vec<Value>) -> IndexMap<String, Value> {
    match fields.into_iter().next() {
        Some(Value::Map(m)) => m,
        _ => IndexMap::new(),
    }
}

/// V2 adds spatial/temporal value structs to the codec mapper table
/// (spec.md §4.G); materialising them as typed values is out of scope
/// (spec.md §1 Non-goals: "the set of typed graph-value wrapper
/// classes"), so no signatures are registered here — they, and the
/// graph structure signatures (node/relationship/path), fall through to
/// `Unpacker`'s generic `Value::Structure`, preserving `(signature,
/// fields)` for an external collaborator to materialise.
fn register_struct_mappers(_unpacker: &mut Unpacker) {}
