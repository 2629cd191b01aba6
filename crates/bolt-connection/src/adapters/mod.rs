//! Per-protocol-version request encoding (spec.md §4.G).
//!
//! A single [`Adapter`], parameterised by the negotiated
//! [`ProtocolVersion`], stands in for the five version-specific
//! "adapters" spec.md names (V1, V2, V3, V4.0/4.1, V4.3) — the wire
//! message shapes for V1/V2 are identical (V2's only difference is
//! codec-level struct-mapper registration, out of this crate's
//! responsibility) and V4.0/V4.1 differ only in whether routing context
//! is accepted in `hello`, so four structs would duplicate far more than
//! they'd distinguish. Every branch point spec.md's table describes is
//! still present, gated on `self.version` via the `supports_*` helpers
//! on [`ProtocolVersion`].

mod requests;

pub use requests::{AccessMode, AuthToken, HelloOptions, RunRequest, TxExtra, WireRequest};

use crate::error::ConnectionError;
use crate::signatures;
use crate::version::ProtocolVersion;
use bolt_packstream::{Structure, Value};
use indexmap::IndexMap;

/// Encodes request-side messages for one negotiated protocol version and
/// normalises response metadata key names to a single vocabulary (spec.md
/// §4.G). Stateless beyond the version itself — safe to share across
/// connections via `Clone`/`Copy`.
#[derive(Debug, Clone, Copy)]
pub struct Adapter {
    version: ProtocolVersion,
}

impl Adapter {
    pub fn for_version(version: ProtocolVersion) -> Self {
        Adapter { version }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// `init` (pre-V3) or `hello` (V3+).
    pub fn hello(&self, opts: &HelloOptions) -> Result<Value, ConnectionError> {
        if opts.routing_context.is_some() && !self.version.supports_routing_context_in_hello() {
            return self.reject("routing_context in hello");
        }
        if opts.database.is_some() && !self.version.supports_database_selector() {
            return self.reject("database in hello");
        }

        if self.version.is_v1_or_v2() {
            let mut fields = opts.auth.to_map();
            fields.insert("user_agent".into(), Value::String(opts.user_agent.to_owned()));
            return Ok(Value::Structure(Structure::new(
                signatures::INIT_OR_HELLO,
                vec![Value::String(opts.user_agent.to_owned()), Value::map(fields)],
            )));
        }

        let mut extra = opts.auth.to_map();
        extra.insert("user_agent".into(), Value::String(opts.user_agent.to_owned()));
        if let Some(ctx) = opts.routing_context {
            extra.insert("routing".into(), Value::Map(ctx.clone()));
        }
        if let Some(db) = opts.database {
            extra.insert("database".into(), Value::String(db.to_owned()));
        }
        Ok(Value::Structure(Structure::new(signatures::INIT_OR_HELLO, vec![Value::map(extra)])))
    }

    /// `goodbye` — only sent on V3+; pre-V3 connections just close the
    /// socket (spec.md §4.F close protocol).
    pub fn goodbye(&self) -> Option<Value> {
        self.version
            .supports_explicit_begin()
            .then(|| Value::Structure(Structure::new(signatures::GOODBYE, vec![])))
    }

    /// The auto-commit `RUN` message. Never needs a paired `PULL_ALL` for
    /// the RUN itself — PULL/PULL_ALL is always issued separately by the
    /// caller once it decides how many records to fetch.
    pub fn run(&self, req: &RunRequest) -> Result<Value, ConnectionError> {
        if req.database.is_some() && !self.version.supports_database_selector() {
            return self.reject("database on run");
        }
        let fields = vec![
            Value::String(req.statement.to_owned()),
            Value::map(req.parameters.clone()),
            Value::map(self.tx_extra_fields(req.bookmarks, req.tx_timeout, req.tx_metadata.as_ref(), req.mode, req.database)?),
        ];
        if self.version.is_v1_or_v2() {
            // V1/V2 RUN carries no extra map at all.
            return Ok(Value::Structure(Structure::new(
                signatures::RUN,
                vec![Value::String(req.statement.to_owned()), Value::map(req.parameters.clone())],
            )));
        }
        Ok(Value::Structure(Structure::new(signatures::RUN, fields)))
    }

    /// `BEGIN` (V3+) or the V1/V2 `RUN("BEGIN", ...) + PULL_ALL` pair
    /// (spec.md §4.G: "transactions are modelled as
    /// `run("BEGIN", bookmark_params)` + `pull_all()`").
    pub fn begin(&self, tx: &TxExtra) -> Result<Vec<WireRequest>, ConnectionError> {
        if tx.database.is_some() && !self.version.supports_database_selector() {
            return self.reject_vec("database on begin");
        }
        if self.version.is_v1_or_v2() {
            let params = bookmark_params(tx.bookmarks);
            let run = Structure::new(signatures::RUN, vec![Value::String("BEGIN".into()), Value::map(params)]);
            return Ok(vec![
                WireRequest { message: Value::Structure(run), needs_pull: true },
            ]);
        }
        let extra = self.tx_extra_fields(tx.bookmarks, tx.tx_timeout, tx.tx_metadata.as_ref(), tx.mode, tx.database)?;
        let begin = Structure::new(signatures::ACK_FAILURE_OR_BEGIN, vec![Value::map(extra)]);
        Ok(vec![WireRequest { message: Value::Structure(begin), needs_pull: false }])
    }

    pub fn run_in_transaction(
        &self,
        statement: &str,
        parameters: IndexMap<String, Value>,
    ) -> Value {
        if self.version.is_v1_or_v2() {
            return Value::Structure(Structure::new(
                signatures::RUN,
                vec![Value::String(statement.to_owned()), Value::map(parameters)],
            ));
        }
        Value::Structure(Structure::new(
            signatures::RUN,
            vec![Value::String(statement.to_owned()), Value::map(parameters), Value::map(IndexMap::new())],
        ))
    }

    pub fn commit(&self) -> Vec<WireRequest> {
        if self.version.is_v1_or_v2() {
            let run = Structure::new(signatures::RUN, vec![Value::String("COMMIT".into()), Value::map(IndexMap::new())]);
            return vec![WireRequest { message: Value::Structure(run), needs_pull: true }];
        }
        vec![WireRequest {
            message: Value::Structure(Structure::new(signatures::COMMIT, vec![])),
            needs_pull: false,
        }]
    }

    pub fn rollback(&self) -> Vec<WireRequest> {
        if self.version.is_v1_or_v2() {
            let run = Structure::new(signatures::RUN, vec![Value::String("ROLLBACK".into()), Value::map(IndexMap::new())]);
            return vec![WireRequest { message: Value::Structure(run), needs_pull: true }];
        }
        vec![WireRequest {
            message: Value::Structure(Structure::new(signatures::ROLLBACK, vec![])),
            needs_pull: false,
        }]
    }

    /// `PULL_ALL` (pre-V4) or `PULL{n, qid}` (V4+). `n`/`qid` are ignored
    /// pre-V4 — all records are always pulled.
    pub fn pull(&self, n: Option<i64>, qid: Option<i64>) -> Value {
        if self.version.supports_qid_pull() {
            let mut extra = IndexMap::new();
            extra.insert("n".into(), Value::Integer(n.unwrap_or(-1)));
            if let Some(qid) = qid {
                extra.insert("qid".into(), Value::Integer(qid));
            }
            return Value::Structure(Structure::new(signatures::PULL_ALL_OR_PULL, vec![Value::map(extra)]));
        }
        Value::Structure(Structure::new(signatures::PULL_ALL_OR_PULL, vec![]))
    }

    /// `DISCARD_ALL` (pre-V4) or `DISCARD{n, qid}` (V4+).
    pub fn discard(&self, n: Option<i64>, qid: Option<i64>) -> Value {
        if self.version.supports_qid_pull() {
            let mut extra = IndexMap::new();
            extra.insert("n".into(), Value::Integer(n.unwrap_or(-1)));
            if let Some(qid) = qid {
                extra.insert("qid".into(), Value::Integer(qid));
            }
            return Value::Structure(Structure::new(signatures::DISCARD, vec![Value::map(extra)]));
        }
        Value::Structure(Structure::new(signatures::DISCARD_ALL, vec![]))
    }

    pub fn reset(&self) -> Value {
        Value::Structure(Structure::new(signatures::RESET, vec![]))
    }

    /// `ack_failure` pre-V3; V3+ uses `reset` instead for the same
    /// purpose (spec.md §4.F), so this returns `None` there.
    pub fn ack_failure(&self) -> Option<Value> {
        (!self.version.supports_explicit_begin())
            .then(|| Value::Structure(Structure::new(signatures::ACK_FAILURE_OR_BEGIN, vec![])))
    }

    /// `ROUTE` — only V4.3+; older versions rely on the server-side
    /// routing procedure instead (spec.md §4.I).
    pub fn route(
        &self,
        context: IndexMap<String, Value>,
        bookmarks: &[String],
        database: Option<&str>,
    ) -> Result<Value, ConnectionError> {
        if !self.version.supports_route_message() {
            return self.reject("route message");
        }
        let db = database.map(Value::from).unwrap_or(Value::Null);
        let bookmarks = Value::List(bookmarks.iter().cloned().map(Value::String).collect());
        Ok(Value::Structure(Structure::new(
            signatures::ROUTE,
            vec![Value::map(context), bookmarks, db],
        )))
    }

    /// Rename `t_first`/`t_last` to `result_available_after`/
    /// `result_consumed_after` (V3+ only; spec.md §4.G).
    pub fn normalize_metadata(&self, mut raw: IndexMap<String, Value>) -> IndexMap<String, Value> {
        if self.version.supports_explicit_begin() {
            if let Some(v) = raw.shift_remove("t_first") {
                raw.insert("result_available_after".into(), v);
            }
            if let Some(v) = raw.shift_remove("t_last") {
                raw.insert("result_consumed_after".into(), v);
            }
        }
        raw
    }

    fn tx_extra_fields(
        &self,
        bookmarks: &[String],
        tx_timeout: Option<i64>,
        tx_metadata: Option<&IndexMap<String, Value>>,
        mode: AccessMode,
        database: Option<&str>,
    ) -> Result<IndexMap<String, Value>, ConnectionError> {
        if (tx_timeout.is_some() || tx_metadata.is_some()) && !self.version.supports_explicit_begin() {
            return Err(ConnectionError::UnsupportedOption {
                option: "tx_timeout/tx_metadata",
                version: self.version.to_string(),
            });
        }
        let mut extra = bookmark_params(bookmarks);
        if let Some(timeout) = tx_timeout {
            extra.insert("tx_timeout".into(), Value::Integer(timeout));
        }
        if let Some(metadata) = tx_metadata {
            extra.insert("tx_metadata".into(), Value::Map(metadata.clone()));
        }
        if mode == AccessMode::Read {
            extra.insert("mode".into(), Value::String("r".into()));
        }
        if let Some(db) = database {
            extra.insert("database".into(), Value::String(db.to_owned()));
        }
        Ok(extra)
    }

    fn reject<T>(&self, option: &'static str) -> Result<T, ConnectionError> {
        Err(ConnectionError::UnsupportedOption { option, version: self.version.to_string() })
    }

    fn reject_vec(&self, option: &'static str) -> Result<Vec<WireRequest>, ConnectionError> {
        Err(ConnectionError::UnsupportedOption { option, version: self.version.to_string() })
    }
}

fn bookmark_params(bookmarks: &[String]) -> IndexMap<String, Value> {
    let mut map = IndexMap::new();
    if !bookmarks.is_empty() {
        map.insert(
            "bookmarks".into(),
            Value::List(bookmarks.iter().cloned().map(Value::String).collect()),
        );
    }
    map
}
