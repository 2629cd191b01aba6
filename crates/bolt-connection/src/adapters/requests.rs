use bolt_packstream::Value;
use indexmap::IndexMap;

/// Read vs write access mode, carried in V3+ transaction `extra` as
/// `mode: "r"` (omitted entirely for the write default — spec.md §4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

/// The credential payload folded into `init`/`hello` (spec.md §4.G,
/// external collaborator per spec.md §1 — only its wire shape lives
/// here, not how a caller obtains or stores credentials).
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub scheme: String,
    pub principal: Option<String>,
    pub credentials: Option<String>,
    pub extra: IndexMap<String, Value>,
}

impl AuthToken {
    pub fn basic(principal: impl Into<String>, credentials: impl Into<String>) -> Self {
        AuthToken {
            scheme: "basic".to_owned(),
            principal: Some(principal.into()),
            credentials: Some(credentials.into()),
            extra: IndexMap::new(),
        }
    }

    pub fn none() -> Self {
        AuthToken { scheme: "none".to_owned(), principal: None, credentials: None, extra: IndexMap::new() }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        let mut extra = IndexMap::new();
        extra.insert("credentials".into(), Value::String(token.into()));
        AuthToken { scheme: "bearer".to_owned(), principal: None, credentials: None, extra }
    }

    pub(crate) fn to_map(&self) -> IndexMap<String, Value> {
        let mut map = IndexMap::new();
        map.insert("scheme".into(), Value::String(self.scheme.clone()));
        if let Some(p) = &self.principal {
            map.insert("principal".into(), Value::String(p.clone()));
        }
        if let Some(c) = &self.credentials {
            map.insert("credentials".into(), Value::String(c.clone()));
        }
        for (k, v) in &self.extra {
            map.insert(k.clone(), v.clone());
        }
        map
    }
}

pub struct HelloOptions<'a> {
    pub user_agent: &'a str,
    pub auth: &'a AuthToken,
    pub routing_context: Option<&'a IndexMap<String, Value>>,
    pub database: Option<&'a str>,
}

pub struct RunRequest<'a> {
    pub statement: &'a str,
    pub parameters: IndexMap<String, Value>,
    pub bookmarks: &'a [String],
    pub tx_timeout: Option<i64>,
    pub tx_metadata: Option<IndexMap<String, Value>>,
    pub mode: AccessMode,
    pub database: Option<&'a str>,
}

pub struct TxExtra<'a> {
    pub bookmarks: &'a [String],
    pub tx_timeout: Option<i64>,
    pub tx_metadata: Option<IndexMap<String, Value>>,
    pub mode: AccessMode,
    pub database: Option<&'a str>,
}

/// One message an adapter wants written to the wire. `needs_pull` is set
/// only for the V1/V2 `RUN("BEGIN"/"COMMIT"/"ROLLBACK")` transaction
/// boundary encoding, which must be followed by a `PULL_ALL` the same
/// way every other V1/V2 `RUN` is (spec.md §4.G).
pub struct WireRequest {
    pub message: Value,
    pub needs_pull: bool,
}
