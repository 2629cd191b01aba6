use crate::failure::Failure;
use bolt_channel::ChannelError;
use bolt_chunking::ChunkingError;
use bolt_packstream::{DecodingError, EncodingError};
use thiserror::Error;

/// Failures from the connection state machine (spec.md §4.F, §7).
///
/// `Fatal` wraps whatever broke the transport or protocol framing and is
/// the sticky error recorded on a broken connection: once set, every
/// further operation on that connection returns it again rather than
/// attempting more I/O.
#[derive(Debug, Error, Clone)]
pub enum ConnectionError {
    #[error("transport error: {0}")]
    Channel(String),

    #[error("chunking error: {0}")]
    Chunking(String),

    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("decoding error: {0}")]
    Decoding(#[from] DecodingError),

    #[error("server replied with an unrecognised protocol version 0x{0:08x}")]
    NoAgreedVersion(u32),

    #[error("server responded HTTP. HTTP defaults to port 7474 whereas the native protocol defaults to port 7687.")]
    WrongEndpoint,

    #[error("option '{option}' is not supported by protocol version {version}")]
    UnsupportedOption { option: &'static str, version: String },

    #[error("server failure: {0}")]
    Failure(Failure),

    #[error("connection is broken: {0}")]
    Broken(Box<ConnectionError>),

    #[error("connection is closed")]
    Closed,

    #[error("authentication failed: {0}")]
    Unauthorized(String),
}

impl From<ChannelError> for ConnectionError {
    fn from(e: ChannelError) -> Self {
        ConnectionError::Channel(e.to_string())
    }
}

impl From<ChunkingError> for ConnectionError {
    fn from(e: ChunkingError) -> Self {
        ConnectionError::Chunking(e.to_string())
    }
}

impl ConnectionError {
    /// The dot-delimited classifier string spec.md §7 attaches to every
    /// error, used by the routing layer's error classification table.
    pub fn code(&self) -> &str {
        match self {
            ConnectionError::Failure(f) => &f.code,
            ConnectionError::Channel(_) | ConnectionError::Broken(_) => "ServiceUnavailable",
            ConnectionError::Unauthorized(_) => "Neo.ClientError.Security.Unauthorized",
            ConnectionError::WrongEndpoint
            | ConnectionError::NoAgreedVersion(_)
            | ConnectionError::Chunking(_)
            | ConnectionError::Encoding(_)
            | ConnectionError::Decoding(_) => "ProtocolError",
            ConnectionError::UnsupportedOption { .. } => "ClientError",
            ConnectionError::Closed => "ClientError",
        }
    }
}
