//! Test-only helpers shared across the workspace's connection, routing,
//! and session test suites: an in-memory [`Channel`](bolt_channel::Channel)
//! pair and a scripted fake server driven over it, so higher layers can be
//! exercised without a real socket.

mod duplex;
mod fake_server;
mod raw_tcp;

pub use duplex::{duplex_pair, DuplexChannel};
pub use fake_server::{perform_handshake, run_fake_server, run_script, ScriptStep};
pub use raw_tcp::RawTcpChannel;
