use bolt_channel::ChannelError;
use bolt_connection::{ConnectionError, Failure};
use thiserror::Error;

/// Failures from the connection pool and routing layer (spec.md §4.H,
/// §4.I, §7).
#[derive(Debug, Error, Clone)]
pub enum RoutingError {
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("no router in the seed list could provide a routing table")]
    ServiceUnavailable,

    #[error("routing is misconfigured: {0}")]
    Configuration(String),

    #[error("server failure: {0}")]
    Failure(Failure),

    #[error("host-name resolution failed for '{0}'")]
    Resolution(String),

    #[error("connection pool for {address} is exhausted (max {max})")]
    PoolExhausted { address: String, max: usize },
}

impl From<ChannelError> for RoutingError {
    fn from(e: ChannelError) -> Self {
        RoutingError::Connection(ConnectionError::Channel(e.to_string()))
    }
}

/// The error-classification categories spec.md §4.H partitions the wire
/// vocabulary into. The routing layer and the retry executor
/// (`bolt-driver`) both key their reactions off this, not off the raw
/// code string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// `forget(address)` is warranted; the retry executor may retry.
    Availability,
    /// `forgetWriter(address)` is warranted in addition to `Availability`'s
    /// reaction.
    WriteFailure,
    /// Retry-eligible but does not imply the address is bad.
    Transient,
    /// Surface to the caller, never retry, never forget.
    FatalAuth,
    Protocol,
    /// User input / misconfiguration — surface directly.
    Client,
}

/// Classify a dot-delimited error `code` per spec.md §4.H's table.
pub fn classify(code: &str) -> ErrorClass {
    match code {
        "ServiceUnavailable" | "SessionExpired" | "Neo.TransientError.General.DatabaseUnavailable" => {
            ErrorClass::Availability
        }
        "Neo.ClientError.Cluster.NotALeader" | "Neo.ClientError.General.ForbiddenOnReadOnlyDatabase" => {
            ErrorClass::WriteFailure
        }
        "Neo.ClientError.Security.Unauthorized" => ErrorClass::FatalAuth,
        "ProtocolError" => ErrorClass::Protocol,
        code if code.starts_with("Neo.ClientError.") => ErrorClass::Client,
        code if code.contains(".TransientError.") => {
            if code.ends_with(".Terminated") || code.ends_with(".LockClientStopped") {
                ErrorClass::Client
            } else {
                ErrorClass::Transient
            }
        }
        _ => ErrorClass::Client,
    }
}

/// Classify whatever code a [`RoutingError`] carries. Transport-level
/// variants with no server-supplied code are treated as `Availability`
/// per spec.md §7 ("Channel-level errors ... surface here, re-tagged
/// with a `SessionExpired` error code").
pub fn classify_error(err: &RoutingError) -> ErrorClass {
    match err {
        RoutingError::Connection(ConnectionError::Failure(f)) => classify(&f.code),
        RoutingError::Connection(ConnectionError::Channel(_) | ConnectionError::Broken(_)) => {
            ErrorClass::Availability
        }
        RoutingError::Connection(ConnectionError::Unauthorized(_)) => ErrorClass::FatalAuth,
        RoutingError::Connection(_) => ErrorClass::Protocol,
        RoutingError::Failure(f) => classify(&f.code),
        RoutingError::ServiceUnavailable | RoutingError::PoolExhausted { .. } => ErrorClass::Availability,
        RoutingError::Configuration(_) | RoutingError::Resolution(_) => ErrorClass::Client,
    }
}
