//! Packstream marker byte constants (spec.md §4.C).

pub const TINY_INT_MAX: i64 = 127;
pub const TINY_INT_MIN: i64 = -16;

pub const TINY_STRING: u8 = 0x80;
pub const TINY_LIST: u8 = 0x90;
pub const TINY_MAP: u8 = 0xA0;
pub const TINY_STRUCT: u8 = 0xB0;

pub const NULL: u8 = 0xC0;
pub const FLOAT64: u8 = 0xC1;
pub const FALSE: u8 = 0xC2;
pub const TRUE: u8 = 0xC3;

pub const INT8: u8 = 0xC8;
pub const INT16: u8 = 0xC9;
pub const INT32: u8 = 0xCA;
pub const INT64: u8 = 0xCB;

pub const STRING8: u8 = 0xD0;
pub const STRING16: u8 = 0xD1;
pub const STRING32: u8 = 0xD2;

pub const LIST8: u8 = 0xD4;
pub const LIST16: u8 = 0xD5;
pub const LIST32: u8 = 0xD6;

pub const MAP8: u8 = 0xD8;
pub const MAP16: u8 = 0xD9;
pub const MAP32: u8 = 0xDA;

pub const STRUCT8: u8 = 0xDC;
pub const STRUCT16: u8 = 0xDD;

/// Maximum string/list/map element count before `STRING32`/`LIST32`/`MAP32`
/// can no longer represent it.
pub const MAX_CONTAINER_SIZE: u64 = u32::MAX as u64;

/// Maximum struct field count (`STRUCT16`'s u16 length field).
pub const MAX_STRUCT_SIZE: u64 = u16::MAX as u64;
