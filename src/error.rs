use bolt_connection::ConnectionError;
use bolt_routing::{classify_error, ErrorClass, RoutingError};
use thiserror::Error;

/// The aggregating error type every public `bolt_driver` entry point
/// returns (spec.md §7). Lower layers keep their own narrower error
/// enums; this just folds them into one type a caller can match on
/// without reaching into `bolt-connection`/`bolt-routing` directly.
#[derive(Debug, Error, Clone)]
pub enum Error {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("invalid connection url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("a result stream is already open on this session")]
    StreamAlreadyOpen,

    #[error("a transaction is already open on this session")]
    TransactionAlreadyOpen,

    #[error("the driver has been closed")]
    DriverClosed,
}

impl Error {
    /// Classify this error per spec.md §4.H/§7's table, the same
    /// vocabulary the routing layer uses to decide `forget`/`forgetWriter`.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Connection(e) => classify_error(&RoutingError::Connection(e.clone())),
            Error::Routing(e) => classify_error(e),
            Error::Configuration(_) | Error::InvalidUrl { .. } => ErrorClass::Client,
            Error::StreamAlreadyOpen | Error::TransactionAlreadyOpen | Error::DriverClosed => ErrorClass::Client,
        }
    }

    /// Whether the transaction retry executor (spec.md §4.K) is allowed
    /// to retry the unit of work that produced this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::Availability | ErrorClass::WriteFailure | ErrorClass::Transient)
    }
}
