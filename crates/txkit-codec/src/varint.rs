//! Bitcoin protocol variable-length integer.
//!
//! VarInt encodes an unsigned 64-bit count in 1, 3, 5, or 9 bytes depending
//! on its magnitude. It prefixes every length or element count in the
//! transaction, Merkle-path, and BEEF wire formats.

/// A Bitcoin protocol variable-length integer.
///
/// Encoding:
///
/// | Range                  | Bytes                |
/// |------------------------|----------------------|
/// | `0..=0xFC`             | value itself         |
/// | `0xFD..=0xFFFF`        | `0xFD` + 2 bytes LE  |
/// | `0x10000..=0xFFFFFFFF` | `0xFE` + 4 bytes LE  |
/// | larger                 | `0xFF` + 8 bytes LE  |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarInt(pub u64);

impl VarInt {
    /// Return the wire-format byte length of this VarInt.
    pub fn encoded_len(&self) -> usize {
        match self.0 {
            0..=0xFC => 1,
            0xFD..=0xFFFF => 3,
            0x1_0000..=0xFFFF_FFFF => 5,
            _ => 9,
        }
    }

    /// Encode this VarInt into a new byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        match self.0 {
            v @ 0..=0xFC => out.push(v as u8),
            v @ 0xFD..=0xFFFF => {
                out.push(0xFD);
                out.extend_from_slice(&(v as u16).to_le_bytes());
            }
            v @ 0x1_0000..=0xFFFF_FFFF => {
                out.push(0xFE);
                out.extend_from_slice(&(v as u32).to_le_bytes());
            }
            v => {
                out.push(0xFF);
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        out
    }

    /// Return the underlying u64 value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for VarInt {
    fn from(v: u64) -> Self {
        VarInt(v)
    }
}

impl From<usize> for VarInt {
    fn from(v: usize) -> Self {
        VarInt(v as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_len_at_width_boundaries() {
        assert_eq!(VarInt(0).encoded_len(), 1);
        assert_eq!(VarInt(0xFC).encoded_len(), 1);
        assert_eq!(VarInt(0xFD).encoded_len(), 3);
        assert_eq!(VarInt(0xFFFF).encoded_len(), 3);
        assert_eq!(VarInt(0x1_0000).encoded_len(), 5);
        assert_eq!(VarInt(0xFFFF_FFFF).encoded_len(), 5);
        assert_eq!(VarInt(0x1_0000_0000).encoded_len(), 9);
        assert_eq!(VarInt(u64::MAX).encoded_len(), 9);
    }

    #[test]
    fn to_bytes_matches_reference_vectors() {
        let cases: Vec<(u64, Vec<u8>)> = vec![
            (0, vec![0x00]),
            (1, vec![0x01]),
            (252, vec![0xFC]),
            (253, vec![0xFD, 0xFD, 0x00]),
            (65535, vec![0xFD, 0xFF, 0xFF]),
            (65536, vec![0xFE, 0x00, 0x00, 0x01, 0x00]),
            (4294967295, vec![0xFE, 0xFF, 0xFF, 0xFF, 0xFF]),
            (
                4294967296,
                vec![0xFF, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00],
            ),
            (
                u64::MAX,
                vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF],
            ),
        ];
        for (value, expected) in cases {
            assert_eq!(VarInt(value).to_bytes(), expected, "value {}", value);
        }
    }
}
