use thiserror::Error;

/// Failure modes shared by every buffer backing in this crate.
///
/// Higher layers (packstream, chunking) re-tag these as their own
/// `EncodingError`/`DecodingError` variants rather than exposing them
/// directly to callers.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum BufferError {
    #[error("position {position} out of range for buffer of length {length}")]
    PositionOutOfRange { position: usize, length: usize },

    #[error("attempted to read {requested} bytes with only {remaining} remaining")]
    InsufficientData { requested: usize, remaining: usize },

    #[error("attempted to put/get at offset {offset} in buffer of length {length}")]
    OffsetOutOfRange { offset: usize, length: usize },

    #[error("write would grow buffer past its fixed length {length}")]
    WouldOverflow { length: usize },
}
