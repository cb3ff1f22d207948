#![deny(missing_docs)]

//! Binary wire codec for the txkit transaction engine.
//!
//! Provides the Bitcoin variable-length integer, cursor-based readers and
//! writers for little-endian protocol data, the display-reversed 32-byte
//! `Hash256` type, and the digest helpers (SHA-256, SHA-256d, RIPEMD-160,
//! Hash160) the rest of the engine is built on.

pub mod digest;
pub mod hash256;
pub mod varint;
pub mod wire;

mod error;

pub use error::CodecError;
pub use hash256::Hash256;
pub use varint::VarInt;
pub use wire::{ByteReader, ByteWriter};
