use crate::error::DecodingError;
use crate::value::{Structure, Value};
use std::collections::HashMap;

/// A hook by which higher layers materialise typed values (a graph node,
/// a response message) from a raw `(signature, fields)` structure,
/// without this crate knowing anything about graph types or messages.
///
/// Registered per-signature on an [`crate::Unpacker`]; an unregistered
/// signature falls back to a generic [`Value::Structure`].
pub type StructMapper = fn(Structure) -> Result<Value, DecodingError>;

#[derive(Default, Clone)]
pub struct StructMapperRegistry {
    mappers: HashMap<u8, StructMapper>,
}

impl StructMapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, signature: u8, mapper: StructMapper) -> &mut Self {
        self.mappers.insert(signature, mapper);
        self
    }

    pub fn map(&self, structure: Structure) -> Result<Value, DecodingError> {
        match self.mappers.get(&structure.signature) {
            Some(mapper) => mapper(structure),
            None => Ok(Value::Structure(structure)),
        }
    }
}
