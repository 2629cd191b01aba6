use crate::error::BufferError;
use crate::traits::{ReadBuf, Slice};
use bytes::Bytes;

/// A read-only logical concatenation of sub-buffers — typically the
/// chunk payloads the dechunker accumulated for one message.
///
/// Length is the sum of parts; position straddles part boundaries
/// transparently. Parts are `Bytes`, so slices that stay within one
/// part are zero-copy views over the same storage; a slice that
/// crosses a part boundary is copied into an owned, contiguous `Vec`.
#[derive(Debug, Clone)]
pub struct ComposedBuffer {
    parts: Vec<Bytes>,
    /// Cumulative start offset of each part, same length as `parts`.
    offsets: Vec<usize>,
    total_len: usize,
    position: usize,
}

impl ComposedBuffer {
    pub fn new(parts: Vec<Bytes>) -> Self {
        let mut offsets = Vec::with_capacity(parts.len());
        let mut running = 0usize;
        for part in &parts {
            offsets.push(running);
            running += part.len();
        }
        ComposedBuffer {
            parts,
            offsets,
            total_len: running,
            position: 0,
        }
    }

    pub fn single(part: Bytes) -> Self {
        ComposedBuffer::new(vec![part])
    }

    /// Locate the part index owning absolute offset `at`, plus the
    /// offset within that part.
    fn locate(&self, at: usize) -> Result<(usize, usize), BufferError> {
        if at >= self.total_len {
            return Err(BufferError::OffsetOutOfRange {
                offset: at,
                length: self.total_len,
            });
        }
        // Parts are typically few (one per wire chunk of a message), so a
        // linear scan beats the bookkeeping of a binary search.
        for (idx, &start) in self.offsets.iter().enumerate() {
            let end = start + self.parts[idx].len();
            if at >= start && at < end {
                return Ok((idx, at - start));
            }
        }
        unreachable!("offset within total_len must land in some part")
    }

    fn byte_at(&self, at: usize) -> Result<u8, BufferError> {
        let (idx, within) = self.locate(at)?;
        Ok(self.parts[idx][within])
    }

    fn bytes_at(&self, at: usize, n: usize) -> Result<[u8; 8], BufferError> {
        let mut buf = [0u8; 8];
        for i in 0..n {
            buf[i] = self.byte_at(at + i)?;
        }
        Ok(buf)
    }
}

impl ReadBuf for ComposedBuffer {
    fn len(&self) -> usize {
        self.total_len
    }

    fn position(&self) -> usize {
        self.position
    }

    fn set_position(&mut self, position: usize) -> Result<(), BufferError> {
        if position > self.total_len {
            return Err(BufferError::PositionOutOfRange {
                position,
                length: self.total_len,
            });
        }
        self.position = position;
        Ok(())
    }

    fn get_u8(&self, at: usize) -> Result<u8, BufferError> {
        self.byte_at(at)
    }

    fn get_i16(&self, at: usize) -> Result<i16, BufferError> {
        let b = self.bytes_at(at, 2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    fn get_i32(&self, at: usize) -> Result<i32, BufferError> {
        let b = self.bytes_at(at, 4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn get_i64(&self, at: usize) -> Result<i64, BufferError> {
        let b = self.bytes_at(at, 8)?;
        Ok(i64::from_be_bytes(b))
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
        if n == 0 {
            return Ok(Slice::Borrowed(&[]));
        }
        let start = self.position;
        let end = start + n;
        self.position = end;

        let (start_idx, start_within) = self.locate(start)?;
        let part = &self.parts[start_idx];
        if start_within + n <= part.len() {
            // Entirely within one part: zero-copy borrow.
            return Ok(Slice::Borrowed(&part[start_within..start_within + n]));
        }

        // Crosses a part boundary: copy into an owned, contiguous buffer.
        let mut owned = Vec::with_capacity(n);
        let mut remaining = n;
        let mut idx = start_idx;
        let mut within = start_within;
        while remaining > 0 {
            let part = &self.parts[idx];
            let take = remaining.min(part.len() - within);
            owned.extend_from_slice(&part[within..within + take]);
            remaining -= take;
            idx += 1;
            within = 0;
        }
        debug_assert_eq!(owned.len(), n);
        let _ = end;
        Ok(Slice::Owned(owned))
    }

    fn to_hex(&self) -> String {
        self.parts
            .iter()
            .flat_map(|p| p.iter())
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_across_part_boundaries() {
        let mut buf = ComposedBuffer::new(vec![
            Bytes::from_static(&[0x00, 0x01]),
            Bytes::from_static(&[0x02, 0x03, 0x04]),
        ]);
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.read_u8().unwrap(), 0x00);
        let slice = buf.read_slice(3).unwrap();
        assert_eq!(&*slice, &[0x01, 0x02, 0x03]);
        assert_eq!(buf.read_u8().unwrap(), 0x04);
        assert!(!buf.has_remaining());
    }

    #[test]
    fn single_part_slice_is_borrowed() {
        let mut buf = ComposedBuffer::single(Bytes::from_static(&[1, 2, 3, 4]));
        match buf.read_slice(4).unwrap() {
            Slice::Borrowed(_) => {}
            Slice::Owned(_) => panic!("expected a zero-copy borrow"),
        }
    }

    #[test]
    fn get_i32_spans_parts() {
        let buf = ComposedBuffer::new(vec![
            Bytes::from_static(&[0x00, 0x00]),
            Bytes::from_static(&[0x01, 0x02]),
        ]);
        assert_eq!(buf.get_i32(0).unwrap(), 0x0000_0102);
    }

    #[test]
    fn out_of_range_offset_errors() {
        let buf = ComposedBuffer::single(Bytes::from_static(&[1, 2]));
        assert!(buf.get_u8(5).is_err());
    }

    #[test]
    fn zero_length_slice_on_empty_buffer_is_empty_not_error() {
        let mut buf = ComposedBuffer::new(vec![]);
        assert_eq!(buf.len(), 0);
        assert_eq!(&*buf.read_slice(0).unwrap(), &[] as &[u8]);
    }
}
