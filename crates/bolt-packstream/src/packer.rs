use crate::error::EncodingError;
use crate::markers::*;
use crate::value::{Structure, Value};
use bolt_buffer::WriteBuf;

/// Serialises [`Value`]s onto any [`WriteBuf`] sink — a plain
/// [`bolt_buffer::HeapBuffer`] in tests, or the chunking layer's `Chunker`
/// in production, which streams straight into chunk framing.
pub struct Packer<'a, W: WriteBuf> {
    out: &'a mut W,
}

impl<'a, W: WriteBuf> Packer<'a, W> {
    pub fn new(out: &'a mut W) -> Self {
        Packer { out }
    }

    pub fn pack(&mut self, value: &Value) -> Result<(), EncodingError> {
        match value {
            Value::Null => self.out.write_u8(NULL).map_err(Into::into),
            Value::Boolean(b) => self.out.write_u8(if *b { TRUE } else { FALSE }).map_err(Into::into),
            Value::Integer(i) => self.pack_integer(*i),
            Value::Float(f) => {
                self.out.write_u8(FLOAT64)?;
                self.out.write_f64(*f).map_err(Into::into)
            }
            Value::String(s) => self.pack_string(s),
            Value::List(items) => self.pack_list(items),
            Value::Map(entries) => self.pack_map(entries),
            Value::Structure(s) => self.pack_structure(s),
        }
    }

    /// Choose the shortest encoding that represents `value`: tiny range
    /// first, then int8, int16, int32, int64.
    fn pack_integer(&mut self, value: i64) -> Result<(), EncodingError> {
        if (TINY_INT_MIN..=TINY_INT_MAX).contains(&value) {
            self.out.write_u8(value as u8)?;
        } else if (i8::MIN as i64..=i8::MAX as i64).contains(&value) {
            self.out.write_u8(INT8)?;
            self.out.write_i8(value as i8)?;
        } else if (i16::MIN as i64..=i16::MAX as i64).contains(&value) {
            self.out.write_u8(INT16)?;
            self.out.write_i16(value as i16)?;
        } else if (i32::MIN as i64..=i32::MAX as i64).contains(&value) {
            self.out.write_u8(INT32)?;
            self.out.write_i32(value as i32)?;
        } else {
            self.out.write_u8(INT64)?;
            self.out.write_i64(value)?;
        }
        Ok(())
    }

    fn pack_string(&mut self, s: &str) -> Result<(), EncodingError> {
        let bytes = s.as_bytes();
        let len = bytes.len();
        if len <= 0x0F {
            self.out.write_u8(TINY_STRING | len as u8)?;
        } else if len <= u8::MAX as usize {
            self.out.write_u8(STRING8)?;
            self.out.write_u8(len as u8)?;
        } else if len <= u16::MAX as usize {
            self.out.write_u8(STRING16)?;
            self.out.write_i16(len as i16)?;
        } else if (len as u64) <= MAX_CONTAINER_SIZE {
            self.out.write_u8(STRING32)?;
            self.out.write_i32(len as i32)?;
        } else {
            return Err(EncodingError::SizeLimitExceeded { kind: "string", len });
        }
        self.out.write_bytes(bytes)?;
        Ok(())
    }

    fn pack_list(&mut self, items: &[Value]) -> Result<(), EncodingError> {
        let len = items.len();
        if len <= 0x0F {
            self.out.write_u8(TINY_LIST | len as u8)?;
        } else if len <= u8::MAX as usize {
            self.out.write_u8(LIST8)?;
            self.out.write_u8(len as u8)?;
        } else if len <= u16::MAX as usize {
            self.out.write_u8(LIST16)?;
            self.out.write_i16(len as i16)?;
        } else if (len as u64) <= MAX_CONTAINER_SIZE {
            self.out.write_u8(LIST32)?;
            self.out.write_i32(len as i32)?;
        } else {
            return Err(EncodingError::SizeLimitExceeded { kind: "list", len });
        }
        for item in items {
            self.pack(item)?;
        }
        Ok(())
    }

    fn pack_map(&mut self, entries: &indexmap::IndexMap<String, Value>) -> Result<(), EncodingError> {
        let len = entries.len();
        if len <= 0x0F {
            self.out.write_u8(TINY_MAP | len as u8)?;
        } else if len <= u8::MAX as usize {
            self.out.write_u8(MAP8)?;
            self.out.write_u8(len as u8)?;
        } else if len <= u16::MAX as usize {
            self.out.write_u8(MAP16)?;
            self.out.write_i16(len as i16)?;
        } else if (len as u64) <= MAX_CONTAINER_SIZE {
            self.out.write_u8(MAP32)?;
            self.out.write_i32(len as i32)?;
        } else {
            return Err(EncodingError::SizeLimitExceeded { kind: "map", len });
        }
        // Iteration order of the source mapping is preserved on the wire.
        for (key, value) in entries {
            self.pack_string(key)?;
            self.pack(value)?;
        }
        Ok(())
    }

    fn pack_structure(&mut self, s: &Structure) -> Result<(), EncodingError> {
        let len = s.fields.len();
        if len <= 0x0F {
            self.out.write_u8(TINY_STRUCT | len as u8)?;
        } else if len <= u8::MAX as usize {
            self.out.write_u8(STRUCT8)?;
            self.out.write_u8(len as u8)?;
        } else if (len as u64) <= MAX_STRUCT_SIZE {
            self.out.write_u8(STRUCT16)?;
            self.out.write_i16(len as i16)?;
        } else {
            return Err(EncodingError::SizeLimitExceeded { kind: "struct", len });
        }
        self.out.write_u8(s.signature)?;
        for field in &s.fields {
            self.pack(field)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bolt_buffer::{HeapBuffer, ReadBuf};

    fn pack(value: &Value) -> Vec<u8> {
        let mut buf = HeapBuffer::new();
        Packer::new(&mut buf).pack(value).unwrap();
        buf.as_bytes().to_vec()
    }

    #[test]
    fn tiny_int_uses_single_byte() {
        assert_eq!(pack(&Value::Integer(42)), vec![42]);
        assert_eq!(pack(&Value::Integer(-1)), vec![0xFF]);
    }

    #[test]
    fn picks_shortest_width_table_driven() {
        let cases: Vec<(i64, usize)> = vec![
            (0, 1),
            (127, 1),
            (-16, 1),
            (128, 2),
            (-17, 2),
            (i8::MIN as i64, 2),
            (i16::MAX as i64, 3),
            (i16::MIN as i64, 3),
            (i32::MAX as i64, 5),
            (i32::MIN as i64, 5),
            (i64::MAX, 9),
            (i64::MIN, 9),
        ];
        for (value, expected_len) in cases {
            let bytes = pack(&Value::Integer(value));
            assert_eq!(bytes.len(), expected_len, "value {value}");
        }
    }

    #[test]
    fn tiny_string_marker_encodes_length_in_low_nibble() {
        let bytes = pack(&Value::String("hi".to_owned()));
        assert_eq!(bytes[0], TINY_STRING | 2);
        assert_eq!(&bytes[1..], b"hi");
    }

    #[test]
    fn oversized_struct_fails() {
        let mut buf = HeapBuffer::new();
        let fields = vec![Value::Null; 70_000];
        let err = Packer::new(&mut buf)
            .pack(&Value::Structure(Structure::new(0x01, fields)))
            .unwrap_err();
        assert!(matches!(err, EncodingError::SizeLimitExceeded { kind: "struct", .. }));
    }

    #[test]
    fn map_preserves_iteration_order_on_wire() {
        let map = Value::map(vec![
            ("b".to_owned(), Value::Integer(1)),
            ("a".to_owned(), Value::Integer(2)),
        ]);
        let bytes = pack(&map);
        // TINY_MAP|2, tiny-string "b", int 1, tiny-string "a", int 2
        assert_eq!(bytes[0], TINY_MAP | 2);
        assert_eq!(bytes[1], TINY_STRING | 1);
        assert_eq!(bytes[2], b'b');
    }

    #[test]
    fn round_trip_via_unpacker() {
        use crate::unpacker::Unpacker;
        let value = Value::List(vec![
            Value::Null,
            Value::Boolean(true),
            Value::Integer(-12345),
            Value::Float(1.5),
            Value::String("hello".to_owned()),
        ]);
        let bytes = pack(&value);
        let mut buf = HeapBuffer::wrap(bytes);
        let decoded = Unpacker::new().unpack(&mut buf).unwrap();
        assert_eq!(decoded, value);
        let _ = buf.position(); // sanity: position advanced to end
    }
}
