//! The connection state machine and per-protocol-version request
//! adapters (spec.md §4.F, §4.G): everything between a live
//! [`bolt_channel::Channel`] and the observer-driven request/response
//! API a session sits on top of.

mod adapters;
mod connection;
mod error;
mod failure;
mod observer;
mod signatures;
mod version;

pub use adapters::{AccessMode, Adapter, AuthToken, HelloOptions, RunRequest, TxExtra, WireRequest};
pub use connection::Connection;
pub use error::ConnectionError;
pub use failure::Failure;
pub use observer::{capture_observer, BoxObserver, CaptureHandle, NullObserver, Observer};
pub use version::ProtocolVersion;
