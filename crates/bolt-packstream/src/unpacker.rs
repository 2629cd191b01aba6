use crate::error::DecodingError;
use crate::markers::*;
use crate::struct_mapper::StructMapperRegistry;
use crate::value::{Structure, Value};
use bolt_buffer::ReadBuf;
use indexmap::IndexMap;

/// Deserialises packstream-encoded [`Value`]s from any [`ReadBuf`] source
/// (a contiguous [`bolt_buffer::HeapBuffer`] or a dechunked
/// [`bolt_buffer::ComposedBuffer`]).
#[derive(Default, Clone)]
pub struct Unpacker {
    structs: StructMapperRegistry,
}

impl Unpacker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_struct_mappers(structs: StructMapperRegistry) -> Self {
        Unpacker { structs }
    }

    pub fn struct_mappers_mut(&mut self) -> &mut StructMapperRegistry {
        &mut self.structs
    }

    pub fn unpack<R: ReadBuf>(&self, buf: &mut R) -> Result<Value, DecodingError> {
        let marker = buf.read_u8()?;
        self.unpack_with_marker(buf, marker)
    }

    fn unpack_with_marker<R: ReadBuf>(&self, buf: &mut R, marker: u8) -> Result<Value, DecodingError> {
        match marker {
            NULL => Ok(Value::Null),
            FALSE => Ok(Value::Boolean(false)),
            TRUE => Ok(Value::Boolean(true)),
            FLOAT64 => Ok(Value::Float(buf.read_f64()?)),
            INT8 => Ok(Value::Integer(buf.read_i8()? as i64)),
            INT16 => Ok(Value::Integer(buf.read_i16()? as i64)),
            INT32 => Ok(Value::Integer(buf.read_i32()? as i64)),
            INT64 => Ok(Value::Integer(buf.read_i64()?)),
            0x00..=0x7F => Ok(Value::Integer(marker as i64)),
            0xF0..=0xFF => Ok(Value::Integer(marker as i64 - 256)),
            0x80..=0x8F => self.unpack_string(buf, (marker & 0x0F) as usize),
            STRING8 => {
                let len = buf.read_u8()? as usize;
                self.unpack_string(buf, len)
            }
            STRING16 => {
                let len = buf.read_i16()? as u16 as usize;
                self.unpack_string(buf, len)
            }
            STRING32 => {
                let len = buf.read_i32()? as u32 as usize;
                self.unpack_string(buf, len)
            }
            0x90..=0x9F => self.unpack_list(buf, (marker & 0x0F) as usize),
            LIST8 => {
                let len = buf.read_u8()? as usize;
                self.unpack_list(buf, len)
            }
            LIST16 => {
                let len = buf.read_i16()? as u16 as usize;
                self.unpack_list(buf, len)
            }
            LIST32 => {
                let len = buf.read_i32()? as u32 as usize;
                self.unpack_list(buf, len)
            }
            0xA0..=0xAF => self.unpack_map(buf, (marker & 0x0F) as usize),
            MAP8 => {
                let len = buf.read_u8()? as usize;
                self.unpack_map(buf, len)
            }
            MAP16 => {
                let len = buf.read_i16()? as u16 as usize;
                self.unpack_map(buf, len)
            }
            MAP32 => {
                let len = buf.read_i32()? as u32 as usize;
                self.unpack_map(buf, len)
            }
            0xB0..=0xBF => self.unpack_struct(buf, (marker & 0x0F) as usize),
            STRUCT8 => {
                let len = buf.read_u8()? as usize;
                self.unpack_struct(buf, len)
            }
            STRUCT16 => {
                let len = buf.read_i16()? as u16 as usize;
                self.unpack_struct(buf, len)
            }
            other => Err(DecodingError::UnknownMarker(other)),
        }
    }

    fn unpack_string<R: ReadBuf>(&self, buf: &mut R, len: usize) -> Result<Value, DecodingError> {
        if len > buf.remaining() {
            return Err(DecodingError::SizeMismatch {
                declared: len,
                available: buf.remaining(),
            });
        }
        Ok(Value::String(bolt_buffer::decode_utf8(buf, len)?))
    }

    fn unpack_list<R: ReadBuf>(&self, buf: &mut R, len: usize) -> Result<Value, DecodingError> {
        let mut items = Vec::with_capacity(len.min(4096));
        for _ in 0..len {
            items.push(self.unpack(buf)?);
        }
        Ok(Value::List(items))
    }

    /// Duplicate keys keep the last-written value (lenient decode per
    /// spec); `IndexMap::insert` already gives this semantics while
    /// leaving the earlier key's position untouched.
    fn unpack_map<R: ReadBuf>(&self, buf: &mut R, len: usize) -> Result<Value, DecodingError> {
        let mut map = IndexMap::with_capacity(len.min(4096));
        for _ in 0..len {
            let key = match self.unpack(buf)? {
                Value::String(s) => s,
                other => {
                    tracing::warn!(?other, "map key was not a string; coercing via debug repr");
                    format!("{other:?}")
                }
            };
            let value = self.unpack(buf)?;
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }

    fn unpack_struct<R: ReadBuf>(&self, buf: &mut R, field_count: usize) -> Result<Value, DecodingError> {
        let signature = buf.read_u8()?;
        let mut fields = Vec::with_capacity(field_count.min(4096));
        for _ in 0..field_count {
            fields.push(self.unpack(buf)?);
        }
        self.structs.map(Structure::new(signature, fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bolt_buffer::HeapBuffer;

    #[test]
    fn unknown_marker_fails() {
        let mut buf = HeapBuffer::wrap(vec![0xC7]);
        let err = Unpacker::new().unpack(&mut buf).unwrap_err();
        assert!(matches!(err, DecodingError::UnknownMarker(0xC7)));
    }

    #[test]
    fn truncated_buffer_fails() {
        let mut buf = HeapBuffer::wrap(vec![STRING8, 5, b'h', b'i']);
        assert!(Unpacker::new().unpack(&mut buf).is_err());
    }

    #[test]
    fn unregistered_signature_returns_generic_structure() {
        let mut buf = HeapBuffer::wrap(vec![TINY_STRUCT | 1, 0x01, 0x2A]);
        let v = Unpacker::new().unpack(&mut buf).unwrap();
        let s = v.as_structure().unwrap();
        assert_eq!(s.signature, 0x01);
        assert_eq!(s.fields, vec![Value::Integer(42)]);
    }

    #[test]
    fn registered_signature_uses_mapper() {
        fn to_pair(s: Structure) -> Result<Value, DecodingError> {
            Ok(Value::List(s.fields))
        }
        let mut registry = StructMapperRegistry::new();
        registry.register(0x01, to_pair);
        let unpacker = Unpacker::with_struct_mappers(registry);

        let mut buf = HeapBuffer::wrap(vec![TINY_STRUCT | 1, 0x01, 0x2A]);
        let v = unpacker.unpack(&mut buf).unwrap();
        assert_eq!(v, Value::List(vec![Value::Integer(42)]));
    }

    #[test]
    fn duplicate_map_keys_keep_last_value() {
        // tiny-map(2): "a" -> 1, "a" -> 2
        let mut bytes = vec![TINY_MAP | 2];
        bytes.push(TINY_STRING | 1);
        bytes.push(b'a');
        bytes.push(1);
        bytes.push(TINY_STRING | 1);
        bytes.push(b'a');
        bytes.push(2);
        let mut buf = HeapBuffer::wrap(bytes);
        let v = Unpacker::new().unpack(&mut buf).unwrap();
        let map = v.as_map().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a"), Some(&Value::Integer(2)));
    }
}
