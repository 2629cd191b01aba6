use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("connect timed out")]
    ConnectTimeout,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("invalid server name for TLS: {0}")]
    InvalidServerName(String),

    #[error("server certificate fingerprint for {host} changed since it was first trusted")]
    FingerprintMismatch { host: String },

    #[error("known-hosts file error: {0}")]
    KnownHosts(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("channel is closed")]
    Closed,
}
