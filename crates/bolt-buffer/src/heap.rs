use crate::error::BufferError;
use crate::traits::{ReadBuf, Slice, WriteBuf};
use bytes::{BufMut as _, Bytes, BytesMut};

/// A single contiguous byte buffer, growable on write and position-tracked
/// on read. Backs both "build up a message to encode" and "decode a
/// single unfragmented chunk" use cases.
#[derive(Debug, Clone)]
pub struct HeapBuffer {
    data: BytesMut,
    position: usize,
}

impl HeapBuffer {
    /// An empty, growable buffer — the common encode-side starting point.
    pub fn new() -> Self {
        HeapBuffer {
            data: BytesMut::new(),
            position: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        HeapBuffer {
            data: BytesMut::with_capacity(capacity),
            position: 0,
        }
    }

    /// Wrap existing bytes for decoding, position reset to zero.
    pub fn wrap(data: impl Into<BytesMut>) -> Self {
        HeapBuffer {
            data: data.into(),
            position: 0,
        }
    }

    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn require_offset(&self, at: usize, width: usize) -> Result<(), BufferError> {
        if at + width > self.data.len() {
            return Err(BufferError::OffsetOutOfRange {
                offset: at,
                length: self.data.len(),
            });
        }
        Ok(())
    }

    /// Random-access overwrite, used by the chunker to back-patch a
    /// chunk's two-byte length header once its payload size is known.
    pub fn put_u8(&mut self, at: usize, value: u8) -> Result<(), BufferError> {
        self.require_offset(at, 1)?;
        self.data[at] = value;
        Ok(())
    }

    pub fn put_i16(&mut self, at: usize, value: i16) -> Result<(), BufferError> {
        self.require_offset(at, 2)?;
        self.data[at..at + 2].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub fn put_u16(&mut self, at: usize, value: u16) -> Result<(), BufferError> {
        self.put_i16(at, value as i16)
    }

    pub fn put_i32(&mut self, at: usize, value: i32) -> Result<(), BufferError> {
        self.require_offset(at, 4)?;
        self.data[at..at + 4].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }
}

impl Default for HeapBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadBuf for HeapBuffer {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn position(&self) -> usize {
        self.position
    }

    fn set_position(&mut self, position: usize) -> Result<(), BufferError> {
        if position > self.data.len() {
            return Err(BufferError::PositionOutOfRange {
                position,
                length: self.data.len(),
            });
        }
        self.position = position;
        Ok(())
    }

    fn get_u8(&self, at: usize) -> Result<u8, BufferError> {
        self.require_offset(at, 1)?;
        Ok(self.data[at])
    }

    fn get_i16(&self, at: usize) -> Result<i16, BufferError> {
        self.require_offset(at, 2)?;
        Ok(i16::from_be_bytes(self.data[at..at + 2].try_into().unwrap()))
    }

    fn get_i32(&self, at: usize) -> Result<i32, BufferError> {
        self.require_offset(at, 4)?;
        Ok(i32::from_be_bytes(self.data[at..at + 4].try_into().unwrap()))
    }

    fn get_i64(&self, at: usize) -> Result<i64, BufferError> {
        self.require_offset(at, 8)?;
        Ok(i64::from_be_bytes(self.data[at..at + 8].try_into().unwrap()))
    }

    fn read_u8(&mut self) -> Result<u8, BufferError> {
        let v = self.get_u8(self.position)?;
        self.position += 1;
        Ok(v)
    }

    fn read_i16(&mut self) -> Result<i16, BufferError> {
        let v = self.get_i16(self.position)?;
        self.position += 2;
        Ok(v)
    }

    fn read_i32(&mut self) -> Result<i32, BufferError> {
        let v = self.get_i32(self.position)?;
        self.position += 4;
        Ok(v)
    }

    fn read_i64(&mut self) -> Result<i64, BufferError> {
        let v = self.get_i64(self.position)?;
        self.position += 8;
        Ok(v)
    }

    fn read_slice(&mut self, n: usize) -> Result<Slice<'_>, BufferError> {
        if self.remaining() < n {
            return Err(BufferError::InsufficientData {
                requested: n,
                remaining: self.remaining(),
            });
        }
        let start = self.position;
        self.position += n;
        Ok(Slice::Borrowed(&self.data[start..start + n]))
    }

    fn to_hex(&self) -> String {
        self.data.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl WriteBuf for HeapBuffer {
    fn write_u8(&mut self, value: u8) -> Result<(), BufferError> {
        self.data.put_u8(value);
        Ok(())
    }

    fn write_i16(&mut self, value: i16) -> Result<(), BufferError> {
        self.data.put_i16(value);
        Ok(())
    }

    fn write_i32(&mut self, value: i32) -> Result<(), BufferError> {
        self.data.put_i32(value);
        Ok(())
    }

    fn write_i64(&mut self, value: i64) -> Result<(), BufferError> {
        self.data.put_i64(value);
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        self.data.put_slice(bytes);
        Ok(())
    }
}
