use crate::error::ChunkingError;
use bolt_buffer::{BufferError, HeapBuffer, ReadBuf, WriteBuf};
use bytes::Bytes;

/// Default output buffer capacity, sized to a typical Ethernet MTU minus
/// IP/TCP headers (spec.md §4.D).
pub const DEFAULT_CAPACITY: usize = 1400;

/// A chunk payload can never exceed this — the wire length header is a u16.
pub const MAX_CHUNK_PAYLOAD: usize = 0xFFFF;

/// Frames message bytes into length-prefixed chunks terminated by a
/// zero-length sentinel.
///
/// Exposes the [`WriteBuf`] interface directly: callers (the `Packer`,
/// typically) write values straight into the chunker without staging a
/// whole message first. Chunk boundaries are inserted transparently,
/// either because the configured `capacity` was reached (ordinary
/// MTU-sized framing) or because a single chunk hit the hard 65535-byte
/// payload limit (oversize writes are split automatically).
///
/// Call [`Chunker::message_boundary`] once a full message has been
/// written, then [`Chunker::flush`] to drain the accumulated bytes for
/// the transport. `flush` MUST be called or the message never reaches
/// the wire.
pub struct Chunker {
    capacity: usize,
    buf: HeapBuffer,
    /// Byte offset of the current open chunk's 2-byte length header, if any.
    open_header_at: Option<usize>,
    /// Payload bytes written into the current open chunk so far.
    open_payload_len: usize,
}

impl Chunker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Chunker {
            capacity,
            buf: HeapBuffer::new(),
            open_header_at: None,
            open_payload_len: 0,
        }
    }

    fn ensure_open(&mut self) -> Result<(), ChunkingError> {
        if self.open_header_at.is_none() {
            let at = self.buf.as_bytes().len();
            self.buf.write_bytes(&[0, 0])?;
            self.open_header_at = Some(at);
            self.open_payload_len = 0;
        }
        Ok(())
    }

    /// Back-patch the open chunk's length header with its accumulated
    /// payload size and mark it closed. A no-op if no chunk is open.
    fn close_open_chunk(&mut self) -> Result<(), ChunkingError> {
        if let Some(at) = self.open_header_at.take() {
            self.buf.put_u16(at, self.open_payload_len as u16)?;
            self.open_payload_len = 0;
        }
        Ok(())
    }

    fn append(&mut self, mut data: &[u8]) -> Result<(), ChunkingError> {
        while !data.is_empty() {
            self.ensure_open()?;
            let hard_room = MAX_CHUNK_PAYLOAD - self.open_payload_len;
            let soft_room = self.capacity.saturating_sub(self.open_payload_len);
            let room = hard_room.min(soft_room.max(1));
            let take = data.len().min(room);
            self.buf.write_bytes(&data[..take])?;
            self.open_payload_len += take;
            data = &data[take..];

            let at_hard_cap = self.open_payload_len >= MAX_CHUNK_PAYLOAD;
            let at_soft_cap = self.open_payload_len >= self.capacity;
            if at_hard_cap || at_soft_cap {
                self.close_open_chunk()?;
            }
        }
        Ok(())
    }

    /// Close any open chunk and write the sentinel zero-length chunk that
    /// terminates the message.
    pub fn message_boundary(&mut self) -> Result<(), ChunkingError> {
        self.close_open_chunk()?;
        self.buf.write_bytes(&[0, 0])?;
        Ok(())
    }

    /// Close any open chunk (without a sentinel) and return everything
    /// accumulated so far, ready to hand to the transport. Resets
    /// internal state so the chunker can be reused for the next message.
    pub fn flush(&mut self) -> Result<Bytes, ChunkingError> {
        self.close_open_chunk()?;
        let drained = std::mem::replace(&mut self.buf, HeapBuffer::new());
        Ok(drained.freeze())
    }

    /// Number of bytes accumulated and not yet flushed.
    pub fn pending_len(&self) -> usize {
        self.buf.as_bytes().len()
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteBuf for Chunker {
    fn write_u8(&mut self, value: u8) -> Result<(), BufferError> {
        self.append(&[value]).map_err(|e| match e {
            ChunkingError::Buffer(b) => b,
            ChunkingError::Closed => unreachable!("append never closes"),
        })
    }

    fn write_i16(&mut self, value: i16) -> Result<(), BufferError> {
        self.write_bytes(&value.to_be_bytes())
    }

    fn write_i32(&mut self, value: i32) -> Result<(), BufferError> {
        self.write_bytes(&value.to_be_bytes())
    }

    fn write_i64(&mut self, value: i64) -> Result<(), BufferError> {
        self.write_bytes(&value.to_be_bytes())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        self.append(bytes).map_err(|e| match e {
            ChunkingError::Buffer(b) => b,
            ChunkingError::Closed => unreachable!("append never closes"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_lengths(bytes: &[u8]) -> Vec<usize> {
        let mut lens = Vec::new();
        let mut pos = 0;
        loop {
            let len = u16::from_be_bytes([bytes[pos], bytes[pos + 1]]) as usize;
            pos += 2;
            if len == 0 {
                break;
            }
            lens.push(len);
            pos += len;
        }
        lens
    }

    #[test]
    fn small_message_is_one_chunk_plus_sentinel() {
        let mut c = Chunker::new();
        c.write_bytes(b"hello").unwrap();
        c.message_boundary().unwrap();
        let bytes = c.flush().unwrap();
        assert_eq!(chunk_lengths(&bytes), vec![5]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0, 0]);
    }

    #[test]
    fn oversized_write_splits_at_65535() {
        let mut c = Chunker::with_capacity(MAX_CHUNK_PAYLOAD);
        let payload = vec![0xABu8; 70_000];
        c.write_bytes(&payload).unwrap();
        c.message_boundary().unwrap();
        let bytes = c.flush().unwrap();
        let lens = chunk_lengths(&bytes);
        assert_eq!(lens.len(), (70_000f64 / 65535f64).ceil() as usize);
        assert_eq!(lens.iter().sum::<usize>(), 70_000);
        assert_eq!(lens[0], 65535);
    }

    #[test]
    fn message_framing_chunk_count_matches_ceil_division() {
        for &total in &[1usize, 65535, 65536, 131_070, 131_071, 200_000] {
            let mut c = Chunker::with_capacity(MAX_CHUNK_PAYLOAD);
            c.write_bytes(&vec![0u8; total]).unwrap();
            c.message_boundary().unwrap();
            let bytes = c.flush().unwrap();
            let lens = chunk_lengths(&bytes);
            let expected = (total + MAX_CHUNK_PAYLOAD - 1) / MAX_CHUNK_PAYLOAD;
            assert_eq!(lens.len(), expected, "total={total}");
            assert_eq!(lens.iter().sum::<usize>(), total);
        }
    }

    #[test]
    fn default_capacity_produces_mtu_sized_chunks() {
        let mut c = Chunker::new();
        c.write_bytes(&vec![1u8; 5000]).unwrap();
        c.message_boundary().unwrap();
        let bytes = c.flush().unwrap();
        let lens = chunk_lengths(&bytes);
        assert!(lens.len() > 1);
        assert!(lens.iter().sum::<usize>() == 5000);
    }

    #[test]
    fn flush_resets_state_for_reuse() {
        let mut c = Chunker::new();
        c.write_bytes(b"one").unwrap();
        c.message_boundary().unwrap();
        let _ = c.flush().unwrap();
        assert_eq!(c.pending_len(), 0);

        c.write_bytes(b"two").unwrap();
        c.message_boundary().unwrap();
        let bytes = c.flush().unwrap();
        assert_eq!(chunk_lengths(&bytes), vec![3]);
    }
}
