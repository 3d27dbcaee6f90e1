//! Canonical binary encoding of a built program.
//!
//! ## Wire Format
//!
//! | Bytes | Content |
//! |-------|---------|
//! | 4 | magic `NSAB` |
//! | 1 | format version |
//! | 1 | flags (bit 0: positions included) |
//! | u32 len + UTF-8 | source name, only with positions |
//! | ... | the Program node |
//!
//! Every node is its one-byte type id and field count (both from the schema
//! registry), then with positions its start and end as line, column and
//! offset, then its fields in registry order. Integers are little-endian,
//! strings and lists carry a u32 length, optional fields a presence byte.
//!
//! Decoding an encoding gives back the same tree, positions aside.

pub mod decode;
pub mod encode;
pub mod registry;

pub use decode::{decode, DecodeError, MAX_DEPTH};
pub use encode::{encode, encode_with_options, EncodeOptions};

#[cfg(test)]
mod tests;
