//! Position-tracked, big-endian byte buffers and the UTF-8 codec built on
//! top of them.
//!
//! Two physical backings exist: [`HeapBuffer`], a single growable
//! contiguous array, and [`ComposedBuffer`], a read-only logical
//! concatenation of several buffers (used to reassemble a dechunked
//! message without an eager copy). Both implement [`ReadBuf`]; only
//! `HeapBuffer` implements [`WriteBuf`] directly, since nothing upstream
//! ever needs to write into an already-dechunked composed view.

mod composed;
mod error;
mod heap;
mod traits;
mod utf8;

pub use composed::ComposedBuffer;
pub use error::BufferError;
pub use heap::HeapBuffer;
pub use traits::{ReadBuf, Slice, WriteBuf};
pub use utf8::{decode as decode_utf8, encode as encode_utf8};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips_all_widths() {
        let mut buf = HeapBuffer::new();
        buf.write_u8(0xAB).unwrap();
        buf.write_i16(-1000).unwrap();
        buf.write_i32(i32::MIN).unwrap();
        buf.write_i64(i64::MAX).unwrap();
        buf.write_f64(std::f64::consts::PI).unwrap();

        buf.set_position(0).unwrap();
        assert_eq!(buf.read_u8().unwrap(), 0xAB);
        assert_eq!(buf.read_i16().unwrap(), -1000);
        assert_eq!(buf.read_i32().unwrap(), i32::MIN);
        assert_eq!(buf.read_i64().unwrap(), i64::MAX);
        assert_eq!(buf.read_f64().unwrap(), std::f64::consts::PI);
        assert!(!buf.has_remaining());
    }

    #[test]
    fn put_and_get_are_random_access_and_do_not_move_position() {
        let mut buf = HeapBuffer::new();
        buf.write_bytes(&[0, 0, 0, 0]).unwrap();
        buf.put_u16(0, 0x1234).unwrap();
        assert_eq!(buf.position(), 0);
        assert_eq!(buf.get_u8(0).unwrap(), 0x12);
        assert_eq!(buf.get_u8(1).unwrap(), 0x34);
    }

    #[test]
    fn reading_past_remaining_fails() {
        let mut buf = HeapBuffer::wrap(vec![1, 2, 3]);
        assert!(buf.read_slice(4).is_err());
    }

    #[test]
    fn get_out_of_range_fails() {
        let buf = HeapBuffer::wrap(vec![1, 2, 3]);
        assert!(buf.get_u8(10).is_err());
    }

    #[test]
    fn to_hex_renders_lowercase_pairs() {
        let buf = HeapBuffer::wrap(vec![0x00, 0xab, 0xff]);
        assert_eq!(buf.to_hex(), "00abff");
    }
}
