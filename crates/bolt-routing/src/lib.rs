//! Connection pooling, error classification, and cluster routing-table
//! rediscovery for the bolt driver (spec.md §4.H, §4.I).
//!
//! [`ConnectionPool`] holds per-address idle [`bolt_connection::Connection`]
//! stacks; [`RoutingTable`] is the role-partitioned, TTL-staled member
//! listing; [`Rediscovery`] refreshes a table via the server-side routing
//! procedure or `ROUTE` message; [`Router`] ties all three together behind
//! a single `acquire(role, database)` entry point for the session layer.

mod address;
mod error;
mod pool;
mod rediscovery;
mod router;
mod table;

pub use address::{Address, DnsResolver, IdentityResolver, Resolver};
pub use error::{classify, classify_error, ErrorClass, RoutingError};
pub use pool::{ConnectionPool, Connector};
pub use rediscovery::Rediscovery;
pub use router::Router;
pub use table::RoutingTable;
