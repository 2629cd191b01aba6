use bolt_buffer::BufferError;
use thiserror::Error;

/// Failures while turning a [`crate::Value`] into wire bytes.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum EncodingError {
    #[error("integer {0} has no representation in the packstream grammar")]
    IntegerOutOfRange(i128),

    #[error("{kind} of length {len} exceeds the maximum representable size")]
    SizeLimitExceeded { kind: &'static str, len: usize },

    #[error("buffer error while encoding: {0}")]
    Buffer(#[from] BufferError),
}

/// Failures while turning wire bytes into a [`crate::Value`].
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DecodingError {
    #[error("unknown packstream marker byte 0x{0:02x}")]
    UnknownMarker(u8),

    #[error("struct field count {0} is not registered with any mapper and has no generic fallback")]
    UnmappedStruct(u8),

    #[error("declared size {declared} is inconsistent with {available} bytes available")]
    SizeMismatch { declared: usize, available: usize },

    #[error("buffer error while decoding: {0}")]
    Buffer(#[from] BufferError),
}
