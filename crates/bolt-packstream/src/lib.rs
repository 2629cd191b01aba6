//! PackStream: the tag-byte-framed dynamic value codec used on the bolt
//! wire (spec.md §4.C). Encodes/decodes [`Value`] over any
//! `bolt_buffer::ReadBuf`/`WriteBuf` implementation.

mod error;
mod markers;
mod packer;
mod struct_mapper;
mod unpacker;
mod value;

pub use error::{DecodingError, EncodingError};
pub use packer::Packer;
pub use struct_mapper::{StructMapper, StructMapperRegistry};
pub use unpacker::Unpacker;
pub use value::{Structure, Value};

pub mod markers_for_adapters {
    //! Re-export of the marker constants for crates (e.g. `bolt-connection`)
    //! that need to recognise message signature bytes without duplicating
    //! the table from spec.md §6.
    pub use crate::markers::*;
}
