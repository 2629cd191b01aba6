use crate::config::Config;
use crate::connector::{HelloTemplate, TcpConnector};
use crate::error::Error;
use crate::retry::{execute_with_retry, RetryConfig};
use crate::session::Session;
use crate::url::{self, Mode};
use crate::Bookmarks;
use async_trait::async_trait;
use bolt_channel::TcpChannel;
use bolt_connection::{AccessMode, AuthToken, Connection};
use bolt_routing::{
    classify_error, Address, ConnectionPool, DnsResolver, ErrorClass, Rediscovery, Router, RoutingError,
};
use std::future::Future;
use std::sync::Arc;

/// The seam [`Session`] acquires/releases/forgets connections through
/// (spec.md §4.L): a [`DirectBackend`] talks to exactly one address, a
/// [`RoutingBackend`] discovers and role-routes across a cluster. A
/// session is generic over the transport ([`bolt_channel::Channel`]) but
/// never over the backend — the choice between the two is made once, at
/// [`Driver::connect`], per spec.md's "choose direct vs routing driver".
#[async_trait]
pub(crate) trait Backend<C: bolt_channel::Channel>: Send + Sync {
    async fn acquire(&self, mode: AccessMode, database: Option<&str>) -> Result<(Address, Connection<C>), Error>;
    async fn release(&self, address: &Address, connection: Connection<C>);
    async fn forget(&self, address: &Address, database: &str, error: &RoutingError);
}

struct DirectBackend<C: bolt_channel::Channel> {
    address: Address,
    pool: ConnectionPool<C>,
}

#[async_trait]
impl<C: bolt_channel::Channel> Backend<C> for DirectBackend<C> {
    async fn acquire(&self, _mode: AccessMode, _database: Option<&str>) -> Result<(Address, Connection<C>), Error> {
        let conn = self.pool.acquire(&self.address).await?;
        Ok((self.address.clone(), conn))
    }

    async fn release(&self, address: &Address, connection: Connection<C>) {
        self.pool.release(address, connection).await;
    }

    /// A direct (non-routing) driver has no routing table to mutate —
    /// all it can do in reaction to an availability-class failure is
    /// drop any pooled idle connections to the one address it knows
    /// about (spec.md §4.H).
    async fn forget(&self, address: &Address, _database: &str, error: &RoutingError) {
        if matches!(classify_error(error), ErrorClass::Availability | ErrorClass::WriteFailure) {
            self.pool.purge(address).await;
        }
    }
}

struct RoutingBackend<C: bolt_channel::Channel> {
    router: Router<C>,
}

#[async_trait]
impl<C: bolt_channel::Channel> Backend<C> for RoutingBackend<C> {
    async fn acquire(&self, mode: AccessMode, database: Option<&str>) -> Result<(Address, Connection<C>), Error> {
        self.router.acquire(mode, database).await.map_err(Error::from)
    }

    async fn release(&self, address: &Address, connection: Connection<C>) {
        self.router.release(address, connection).await;
    }

    async fn forget(&self, address: &Address, database: &str, error: &RoutingError) {
        self.router.forget(address, database, error).await;
    }
}

/// The top-level entry point (spec.md §4.L Driver Facade): parses a
/// connection URL, picks direct vs routing mode from its scheme, and
/// hands out [`Session`]s against either. Only the native TCP(+TLS)
/// transport is exposed here — a WebSocket-backed driver is built the
/// same way from [`crate::connector::WsConnector`] for callers that want
/// it, but the facade standardises on `TcpChannel` since that is what a
/// native binary overwhelmingly uses.
pub struct Driver {
    backend: Arc<dyn Backend<TcpChannel>>,
    retry: RetryConfig,
}

impl Driver {
    /// Connect using a [`Config`] seeded from the URL's scheme-implied
    /// trust posture (spec.md §6 scheme table), i.e. the common case of
    /// "just give me a driver for this URL".
    pub async fn connect(url: &str, auth: AuthToken) -> Result<Self, Error> {
        let parsed = url::parse(url)?;
        let config = Config::from_url_trust(&parsed.trust);
        Self::connect_with_config(url, auth, config).await
    }

    /// Connect with an explicit [`Config`] — the config's trust strategy
    /// takes precedence over whatever the URL scheme implies, so a
    /// caller can e.g. point a `bolt+s://` URL at custom root
    /// certificates instead of the OS trust store.
    pub async fn connect_with_config(url: &str, auth: AuthToken, config: Config) -> Result<Self, Error> {
        let parsed = url::parse(url)?;
        let trust = crate::connector::resolve_trust(&config.trust)?;
        let hello = HelloTemplate {
            user_agent: config.user_agent.clone(),
            auth,
            routing_context: parsed.routing_context.clone(),
            database: None,
        };
        let connector = Arc::new(TcpConnector { trust, connect_timeout: config.connection_timeout, hello });
        let pool = ConnectionPool::new(connector.clone(), config.max_connection_pool_size, config.max_connection_lifetime);

        let backend: Arc<dyn Backend<TcpChannel>> = match parsed.mode {
            Mode::Direct => Arc::new(DirectBackend { address: parsed.address(), pool }),
            Mode::Routing => {
                let rediscovery = Rediscovery::new(connector, Arc::new(DnsResolver));
                let router = Router::new(pool, rediscovery, vec![parsed.address()], parsed.routing_context.clone());
                Arc::new(RoutingBackend { router })
            }
        };

        Ok(Driver { backend, retry: config.retry })
    }

    /// Open a new session with no causal-consistency constraint.
    pub fn session(&self, mode: AccessMode, database: Option<String>) -> Session<TcpChannel> {
        self.session_with_bookmarks(mode, database, Bookmarks::empty())
    }

    /// Open a new session that carries forward bookmarks from a
    /// previously-closed session, enforcing read-your-writes across them
    /// (spec.md §3 Session, §4.J Bookmark semantics).
    pub fn session_with_bookmarks(
        &self,
        mode: AccessMode,
        database: Option<String>,
        bookmarks: Bookmarks,
    ) -> Session<TcpChannel> {
        Session::new(self.backend.clone(), mode, database, bookmarks)
    }

    /// Run `work` inside a managed read transaction, retrying on
    /// transient/availability errors per [`RetryConfig`] (spec.md §4.K).
    /// `work` receives a fresh [`crate::session::Transaction`] on every
    /// attempt and is responsible for committing it.
    pub async fn execute_read<F, Fut, T>(&self, database: Option<String>, work: F) -> Result<T, Error>
    where
        F: FnMut(&mut Session<TcpChannel>) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        self.execute(AccessMode::Read, database, work).await
    }

    /// As [`Driver::execute_read`], with a write-mode session (spec.md
    /// §4.K, §8 scenario S6).
    pub async fn execute_write<F, Fut, T>(&self, database: Option<String>, work: F) -> Result<T, Error>
    where
        F: FnMut(&mut Session<TcpChannel>) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        self.execute(AccessMode::Write, database, work).await
    }

    async fn execute<F, Fut, T>(&self, mode: AccessMode, database: Option<String>, mut work: F) -> Result<T, Error>
    where
        F: FnMut(&mut Session<TcpChannel>) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        execute_with_retry(&self.retry, || {
            let mut session = self.session(mode, database.clone());
            let fut = work(&mut session);
            async move {
                let result = fut.await;
                session.close().await;
                result
            }
        })
        .await
    }

    /// Release every resource the driver holds. Sessions already handed
    /// out remain usable until dropped; this only affects future
    /// acquisitions going through this driver's pool(s) (spec.md §4.L
    /// close lifecycle).
    pub async fn close(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_url_does_not_require_network_to_construct_config() {
        let parsed = url::parse("bolt://localhost:7687").unwrap();
        assert_eq!(parsed.mode, Mode::Direct);
    }
}
