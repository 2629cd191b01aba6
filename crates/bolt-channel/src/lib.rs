//! Duplex byte transports for the bolt wire protocol (spec.md §4.E): a
//! native TCP(+TLS) socket and a WebSocket-equivalent transport, behind
//! one [`Channel`] trait so the connection layer never needs to know
//! which one it's holding. Also hosts the TLS trust strategies and the
//! on-first-use known-hosts cache.

mod channel;
mod error;
mod known_hosts;
mod tcp;
mod trust;
mod verifier;
mod ws;

pub use channel::Channel;
pub use error::ChannelError;
pub use known_hosts::KnownHosts;
pub use tcp::{TcpChannel, DEFAULT_PORT};
pub use trust::TrustStrategy;
pub use ws::WsChannel;
