use crate::config::Trust;
use crate::error::Error;
use async_trait::async_trait;
use bolt_channel::{KnownHosts, TcpChannel, TrustStrategy, WsChannel};
use bolt_connection::{AuthToken, Connection, HelloOptions};
use bolt_packstream::Value;
use bolt_routing::{Address, Connector, RoutingError};
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;

/// Resolve a config-level [`Trust`] into the real [`TrustStrategy`] the
/// channel layer needs, loading [`KnownHosts`] from disk for on-first-use
/// trust (spec.md §6) — deferred to connect time rather than
/// config-parse time, since it touches the filesystem.
pub fn resolve_trust(trust: &Trust) -> Result<TrustStrategy, Error> {
    Ok(match trust {
        Trust::Off => TrustStrategy::Off,
        Trust::CustomCAs(paths) => TrustStrategy::CustomCAs(paths.clone()),
        Trust::SystemCAs => TrustStrategy::SystemCAs,
        Trust::AcceptAny => TrustStrategy::All,
        Trust::OnFirstUse(path) => {
            let path = path.clone().unwrap_or_else(KnownHosts::default_path);
            let known_hosts =
                KnownHosts::load(path).map_err(|e| Error::Configuration(format!("known_hosts: {e}")))?;
            TrustStrategy::OnFirstUse(Arc::new(known_hosts))
        }
    })
}

/// The fixed hello-time request data every connection this driver opens
/// (to any address) authenticates and introduces itself with — shared by
/// the direct-mode pool and the routing-mode router (spec.md §4.F/§4.G).
#[derive(Clone)]
pub struct HelloTemplate {
    pub user_agent: String,
    pub auth: AuthToken,
    pub routing_context: IndexMap<String, Value>,
    pub database: Option<String>,
}

impl HelloTemplate {
    fn options(&self) -> HelloOptions<'_> {
        HelloOptions {
            user_agent: &self.user_agent,
            auth: &self.auth,
            routing_context: if self.routing_context.is_empty() { None } else { Some(&self.routing_context) },
            database: self.database.as_deref(),
        }
    }
}

/// Produces authenticated connections over the native TCP(+TLS)
/// transport (spec.md §4.E/§4.H).
pub struct TcpConnector {
    pub trust: TrustStrategy,
    pub connect_timeout: Duration,
    pub hello: HelloTemplate,
}

#[async_trait]
impl Connector<TcpChannel> for TcpConnector {
    async fn connect(&self, address: &Address) -> Result<Connection<TcpChannel>, RoutingError> {
        let channel = TcpChannel::connect(&address.host, address.port, &self.trust, self.connect_timeout).await?;
        Connection::connect(channel, self.hello.options()).await.map_err(RoutingError::Connection)
    }
}

/// Produces authenticated connections over the WebSocket transport
/// (spec.md §4.E), for callers that want the browser-equivalent
/// transport from a native build.
pub struct WsConnector {
    pub secure: bool,
    pub connect_timeout: Duration,
    pub hello: HelloTemplate,
}

#[async_trait]
impl Connector<WsChannel> for WsConnector {
    async fn connect(&self, address: &Address) -> Result<Connection<WsChannel>, RoutingError> {
        let scheme = if self.secure { "wss" } else { "ws" };
        let url = format!("{scheme}://{}:{}", address.host, address.port);
        let channel = WsChannel::connect(&url, self.connect_timeout).await?;
        Connection::connect(channel, self.hello.options()).await.map_err(RoutingError::Connection)
    }
}
