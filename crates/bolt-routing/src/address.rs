use async_trait::async_trait;
use std::fmt;

/// A cluster member address: `host:port` (spec.md §3 RoutingTable,
/// §6 Connection URLs). Cheap to clone and hash — used as the
/// [`crate::ConnectionPool`] key and as `RoutingTable` set elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

impl Address {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Address { host: host.into(), port }
    }

    /// Parse a `host:port` or bare `host` (defaulting to
    /// [`bolt_channel::DEFAULT_PORT`]) string as found in routing-table
    /// server records or seed lists.
    pub fn parse(s: &str) -> Option<Address> {
        match s.rsplit_once(':') {
            Some((host, port)) => port.parse().ok().map(|port| Address::new(host, port)),
            None => Some(Address::new(s, bolt_channel::DEFAULT_PORT)),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Host-name resolution hook (SPEC_FULL §2: "a `Resolver` trait ...
/// since routing rediscovery depends on it"). `resolve` MAY expand one
/// seed address into many (e.g. a round-robin DNS name backing several
/// router IPs); the default implementation performs a real DNS lookup,
/// preserving the original port.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, seed: &Address) -> Result<Vec<Address>, crate::RoutingError>;
}

/// The identity resolver: returns the seed unchanged. Useful when the
/// caller already passed concrete IPs, or in tests.
pub struct IdentityResolver;

#[async_trait]
impl Resolver for IdentityResolver {
    async fn resolve(&self, seed: &Address) -> Result<Vec<Address>, crate::RoutingError> {
        Ok(vec![seed.clone()])
    }
}

/// DNS-backed resolver using `tokio::net::lookup_host`.
pub struct DnsResolver;

#[async_trait]
impl Resolver for DnsResolver {
    async fn resolve(&self, seed: &Address) -> Result<Vec<Address>, crate::RoutingError> {
        let query = format!("{}:{}", seed.host, seed.port);
        let resolved = tokio::net::lookup_host(&query)
            .await
            .map_err(|e| crate::RoutingError::Resolution(format!("{query}: {e}")))?;
        let addrs: Vec<Address> = resolved.map(|sa| Address::new(sa.ip().to_string(), sa.port())).collect();
        if addrs.is_empty() {
            return Err(crate::RoutingError::Resolution(query));
        }
        Ok(addrs)
    }
}
