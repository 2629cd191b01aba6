//! Message chunking for the bolt wire protocol: splits outbound message
//! bytes into length-prefixed chunks terminated by a zero-length sentinel
//! ([`Chunker`]), and reassembles an inbound byte stream back into whole
//! messages regardless of how the transport fragments it ([`Dechunker`]).
//!
//! Both halves are synchronous and transport-agnostic — neither touches a
//! socket. The connection layer owns a channel plus one of each and wires
//! them together: write a message through the `Chunker`, flush its bytes
//! to the channel; feed bytes read off the channel into the `Dechunker`
//! and drain whatever messages become ready.

mod chunker;
mod dechunker;
mod error;

pub use chunker::{Chunker, DEFAULT_CAPACITY, MAX_CHUNK_PAYLOAD};
pub use dechunker::Dechunker;
pub use error::ChunkingError;
