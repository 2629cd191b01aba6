use crate::error::BufferError;
use std::borrow::Cow;

/// A view over `n` contiguous bytes produced by [`ReadBuf::read_slice`].
///
/// Borrowed when the requested range lives inside one physical backing;
/// owned (copied) when it had to be stitched across a [`ComposedBuffer`]
/// boundary. Callers that need raw contiguity (e.g. a socket write) should
/// call [`Slice::as_bytes`] and copy out immediately rather than holding
/// onto the view — see the module-level note on lifetime.
pub type Slice<'a> = Cow<'a, [u8]>;

/// Stateful, position-tracked read side of the buffer abstraction
/// (component A of the driver's wire stack).
///
/// Implementors track a read position in `[0, len()]`; `read_*` calls
/// advance it, `get_*` calls do not. A composed buffer (several
/// sub-buffers stitched into one logical view) and a single contiguous
/// buffer both implement this the same way from a caller's perspective.
pub trait ReadBuf {
    /// Total logical length of the buffer, independent of position.
    fn len(&self) -> usize;

    /// Current read position.
    fn position(&self) -> usize;

    /// Move the read position directly. Used by callers that peek ahead
    /// and need to rewind (e.g. retrying a partial chunk header).
    fn set_position(&mut self, position: usize) -> Result<(), BufferError>;

    /// Bytes left to read before hitting `len()`.
    fn remaining(&self) -> usize {
        self.len() - self.position()
    }

    fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    fn get_u8(&self, at: usize) -> Result<u8, BufferError>;
    fn get_i8(&self, at: usize) -> Result<i8, BufferError> {
        Ok(self.get_u8(at)? as i8)
    }
    fn get_i16(&self, at: usize) -> Result<i16, BufferError>;
    fn get_i32(&self, at: usize) -> Result<i32, BufferError>;
    fn get_i64(&self, at: usize) -> Result<i64, BufferError>;
    fn get_f64(&self, at: usize) -> Result<f64, BufferError> {
        Ok(f64::from_bits(self.get_i64(at)? as u64))
    }

    fn read_u8(&mut self) -> Result<u8, BufferError>;
    fn read_i8(&mut self) -> Result<i8, BufferError> {
        Ok(self.read_u8()? as i8)
    }
    fn read_i16(&mut self) -> Result<i16, BufferError>;
    fn read_i32(&mut self) -> Result<i32, BufferError>;
    fn read_i64(&mut self) -> Result<i64, BufferError>;
    fn read_f64(&mut self) -> Result<f64, BufferError> {
        Ok(f64::from_bits(self.read_i64()? as u64))
    }

    /// Read the next `n` bytes and advance the position by `n`.
    fn read_slice(&mut self, n: usize) -> Result<Slice<'_>, BufferError>;

    /// Hex dump of the full backing content, for trace logging.
    fn to_hex(&self) -> String;
}

/// Stateful write side of the buffer abstraction. Implemented both by
/// [`crate::HeapBuffer`] directly and by the chunking layer's `Chunker`,
/// which streams writes straight into chunk framing instead of
/// buffering a whole message first.
pub trait WriteBuf {
    fn write_u8(&mut self, value: u8) -> Result<(), BufferError>;
    fn write_i8(&mut self, value: i8) -> Result<(), BufferError> {
        self.write_u8(value as u8)
    }
    fn write_i16(&mut self, value: i16) -> Result<(), BufferError>;
    fn write_i32(&mut self, value: i32) -> Result<(), BufferError>;
    fn write_i64(&mut self, value: i64) -> Result<(), BufferError>;
    fn write_f64(&mut self, value: f64) -> Result<(), BufferError> {
        self.write_i64(value.to_bits() as i64)
    }
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), BufferError>;
}
