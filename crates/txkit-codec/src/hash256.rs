//! The 32-byte hash type used for transaction IDs and Merkle nodes.
//!
//! Bytes are stored in internal (little-endian) order and displayed
//! byte-reversed, following Bitcoin's convention.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::digest::sha256d;
use crate::error::CodecError;

/// Size of a `Hash256` in bytes.
pub const HASH256_SIZE: usize = 32;

/// A 32-byte hash in internal byte order, displayed reversed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct Hash256([u8; HASH256_SIZE]);

impl Hash256 {
    /// Wrap a raw 32-byte array (internal byte order).
    pub fn new(bytes: [u8; HASH256_SIZE]) -> Self {
        Hash256(bytes)
    }

    /// Create from a slice that must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != HASH256_SIZE {
            return Err(CodecError::InvalidHash(format!(
                "expected {} bytes, got {}",
                HASH256_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; HASH256_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Hash256(arr))
    }

    /// Parse a byte-reversed (display order) hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, CodecError> {
        let decoded = hex::decode(hex_str)?;
        if decoded.len() != HASH256_SIZE {
            return Err(CodecError::InvalidHash(format!(
                "expected 64 hex chars, got {}",
                hex_str.len()
            )));
        }
        let mut arr = [0u8; HASH256_SIZE];
        for (i, b) in decoded.iter().rev().enumerate() {
            arr[i] = *b;
        }
        Ok(Hash256(arr))
    }

    /// Compute SHA-256d of `data` and wrap the digest.
    pub fn digest(data: &[u8]) -> Self {
        Hash256(sha256d(data))
    }

    /// Borrow the internal byte array.
    pub fn as_bytes(&self) -> &[u8; HASH256_SIZE] {
        &self.0
    }

    /// Return the bytes in display (reversed) order.
    pub fn to_display_bytes(&self) -> [u8; HASH256_SIZE] {
        let mut out = self.0;
        out.reverse();
        out
    }

    /// Whether every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH256_SIZE]
    }
}

impl fmt::Display for Hash256 {
    /// Display as byte-reversed hex, the Bitcoin txid convention.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_display_bytes()))
    }
}

impl FromStr for Hash256 {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash256::from_hex(s)
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash256::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_reverses_bytes() {
        let hash = Hash256::new([
            0x06, 0xe5, 0x33, 0xfd, 0x1a, 0xda, 0x86, 0x39, 0x1f, 0x3f, 0x6c, 0x34, 0x32, 0x04,
            0xb0, 0xd2, 0x78, 0xd4, 0xaa, 0xec, 0x1c, 0x0b, 0x20, 0xaa, 0x27, 0xba, 0x03, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ]);
        assert_eq!(
            hash.to_string(),
            "000000000003ba27aa200b1cecaad478d2b00432346c3f1f3986da1afd33e506"
        );
    }

    #[test]
    fn hex_roundtrip() {
        let s = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f";
        let hash = Hash256::from_hex(s).unwrap();
        assert_eq!(hash.to_string(), s);
        assert_eq!(hash.as_bytes()[0], 0x6f);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Hash256::from_hex("abcd").is_err());
        assert!(Hash256::from_slice(&[0u8; 31]).is_err());
    }

    #[test]
    fn digest_matches_known_vector() {
        let hash = Hash256::digest(b"");
        // sha256d("") with display reversal applied.
        assert_eq!(
            hash.to_string(),
            "56944c5d3f98413ef45cf54545538103cc9f298e0575820ad3591376e2e0f65d"
        );
    }

    #[test]
    fn serde_json_roundtrip() {
        let s = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f";
        let hash = Hash256::from_hex(s).unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", s));
        let back: Hash256 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
