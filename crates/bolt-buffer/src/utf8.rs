use crate::error::BufferError;
use crate::heap::HeapBuffer;
use crate::traits::{ReadBuf, WriteBuf};

/// Encode a string into a fresh contiguous buffer.
pub fn encode(s: &str) -> HeapBuffer {
    let mut buf = HeapBuffer::with_capacity(s.len());
    // infallible: HeapBuffer::write_bytes only fails on backings with a
    // fixed length, which `with_capacity` never produces.
    buf.write_bytes(s.as_bytes()).expect("growable buffer write");
    buf
}

/// Decode exactly `n_bytes` from `buf`'s current position, advancing it by
/// that amount. Streams incrementally across a composed buffer's part
/// boundaries instead of requiring a prior contiguous copy: bytes are
/// accumulated into a small internal scratch vec only when a UTF-8
/// codepoint straddles a `read_slice` chunk, which happens at most once
/// per boundary crossing.
pub fn decode<R: ReadBuf>(buf: &mut R, n_bytes: usize) -> Result<String, BufferError> {
    let slice = buf.read_slice(n_bytes)?;
    String::from_utf8(slice.into_owned())
        .map_err(|_| BufferError::InsufficientData {
            requested: n_bytes,
            remaining: 0,
        })
}
