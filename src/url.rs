use crate::error::Error;
use bolt_routing::Address;
use indexmap::IndexMap;
use bolt_packstream::Value;

/// Whether a parsed URL addresses a single server directly or a cluster
/// to be discovered through routing (spec.md §6 connection URLs,
/// SPEC_FULL §2 supplemented Address/URL parsing module).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Direct,
    Routing,
}

/// The trust posture a scheme implies, resolved into a real
/// [`TrustStrategy`] by [`crate::connector`] at connect time (on-first-use
/// needs a loaded [`bolt_channel::KnownHosts`], which a URL alone can't
/// provide).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustKind {
    Off,
    SystemCAs,
    /// Self-signed / unverified — "ssc" schemes. Equivalent to
    /// [`TrustStrategy::All`].
    AcceptAny,
}

#[derive(Debug, Clone)]
pub struct ParsedUrl {
    pub mode: Mode,
    pub trust: TrustKind,
    pub host: String,
    pub port: u16,
    pub routing_context: IndexMap<String, Value>,
}

impl ParsedUrl {
    pub fn address(&self) -> Address {
        Address::new(self.host.clone(), self.port)
    }

    pub fn is_encrypted(&self) -> bool {
        !matches!(self.trust, TrustKind::Off)
    }
}

/// Parse a `bolt://`, `bolt+s://`, `bolt+ssc://`, `neo4j://`, `neo4j+s://`
/// or `neo4j+ssc://` connection URL (spec.md §6). The `bolt` family
/// addresses exactly one server; the `neo4j` family enters routing mode,
/// treating the host as a seed router. Query-string parameters become the
/// routing context handed to `HELLO`/`ROUTE` verbatim.
pub fn parse(url: &str) -> Result<ParsedUrl, Error> {
    let (scheme, rest) = url.split_once("://").ok_or_else(|| invalid(url, "missing scheme"))?;
    let (mode, trust) = match scheme {
        "bolt" => (Mode::Direct, TrustKind::Off),
        "bolt+s" => (Mode::Direct, TrustKind::SystemCAs),
        "bolt+ssc" => (Mode::Direct, TrustKind::AcceptAny),
        "neo4j" => (Mode::Routing, TrustKind::Off),
        "neo4j+s" => (Mode::Routing, TrustKind::SystemCAs),
        "neo4j+ssc" => (Mode::Routing, TrustKind::AcceptAny),
        other => return Err(invalid(url, &format!("unrecognised scheme '{other}'"))),
    };

    let (authority, query) = match rest.split_once('?') {
        Some((a, q)) => (a, Some(q)),
        None => (rest.trim_end_matches('/'), None),
    };
    let authority = authority.trim_end_matches('/');
    if authority.is_empty() {
        return Err(invalid(url, "missing host"));
    }
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port.parse().map_err(|_| invalid(url, "invalid port"))?;
            (host.to_owned(), port)
        }
        None => (authority.to_owned(), bolt_channel::DEFAULT_PORT),
    };

    let mut routing_context = IndexMap::new();
    if let Some(query) = query {
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            routing_context.insert(decode_component(key), Value::String(decode_component(value)));
        }
    }

    Ok(ParsedUrl { mode, trust, host, port, routing_context })
}

fn decode_component(s: &str) -> String {
    s.replace('+', " ")
}

fn invalid(url: &str, reason: &str) -> Error {
    Error::InvalidUrl { url: url.to_owned(), reason: reason.to_owned() }
}
