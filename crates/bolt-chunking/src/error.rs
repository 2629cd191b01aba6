use bolt_buffer::BufferError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ChunkingError {
    #[error("buffer error while chunking: {0}")]
    Buffer(#[from] BufferError),

    #[error("dechunker is closed")]
    Closed,
}
