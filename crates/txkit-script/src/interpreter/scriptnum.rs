//! Script numbers: sign-and-magnitude little-endian byte arrays.
//!
//! Operands are limited to `max_number_length` bytes when read off the
//! stack, but results may grow arbitrarily; they only fail when a later
//! opcode reinterprets an oversized value as a number.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::error::{ScriptError, ScriptErrorKind};

/// A script number backed by a big integer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScriptNum(BigInt);

impl ScriptNum {
    /// Wrap an i64 value.
    pub fn from_i64(v: i64) -> Self {
        ScriptNum(BigInt::from(v))
    }

    /// Decode a stack element, enforcing the byte-length limit.
    pub fn from_bytes(bytes: &[u8], max_length: usize) -> Result<Self, ScriptError> {
        if bytes.len() > max_length {
            return Err(ScriptError::new(
                ScriptErrorKind::NumericOverflow,
                format!(
                    "numeric operand of {} bytes exceeds the limit of {}",
                    bytes.len(),
                    max_length
                ),
            ));
        }
        if bytes.is_empty() {
            return Ok(ScriptNum(BigInt::zero()));
        }

        let mut v = BigInt::zero();
        for (i, &b) in bytes.iter().enumerate() {
            v |= BigInt::from(b) << (8 * i);
        }
        // The high bit of the last byte is the sign.
        if bytes[bytes.len() - 1] & 0x80 != 0 {
            let mask = !(BigInt::from(0x80u8) << (8 * (bytes.len() - 1)));
            v &= mask;
            v = -v;
        }
        Ok(ScriptNum(v))
    }

    /// Encode as a minimal little-endian sign-and-magnitude byte array.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.0.is_zero() {
            return vec![];
        }
        let negative = self.0.is_negative();
        let mut magnitude = self.0.abs();

        let mut out: Vec<u8> = Vec::new();
        while magnitude > BigInt::zero() {
            out.push((&magnitude & BigInt::from(0xFFu8)).to_u8().unwrap_or(0));
            magnitude >>= 8;
        }

        if out[out.len() - 1] & 0x80 != 0 {
            out.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            let last = out.len() - 1;
            out[last] |= 0x80;
        }
        out
    }

    /// Sum of two numbers.
    pub fn add(&self, other: &ScriptNum) -> ScriptNum {
        ScriptNum(&self.0 + &other.0)
    }

    /// Difference of two numbers.
    pub fn sub(&self, other: &ScriptNum) -> ScriptNum {
        ScriptNum(&self.0 - &other.0)
    }

    /// Product of two numbers.
    pub fn mul(&self, other: &ScriptNum) -> ScriptNum {
        ScriptNum(&self.0 * &other.0)
    }

    /// Quotient, truncated toward zero.
    pub fn div(&self, other: &ScriptNum) -> ScriptNum {
        let (q, _) = self.0.div_rem(&other.0);
        ScriptNum(q)
    }

    /// Truncated remainder.
    pub fn rem(&self, other: &ScriptNum) -> ScriptNum {
        let (_, r) = self.0.div_rem(&other.0);
        ScriptNum(r)
    }

    /// Negation.
    pub fn neg(&self) -> ScriptNum {
        ScriptNum(-&self.0)
    }

    /// Absolute value.
    pub fn abs(&self) -> ScriptNum {
        ScriptNum(self.0.abs())
    }

    /// Whether the value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Whether the value is negative.
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Convert to i64, clamping at the extremes.
    pub fn to_i64(&self) -> i64 {
        self.0.to_i64().unwrap_or(if self.0.is_negative() {
            i64::MIN
        } else {
            i64::MAX
        })
    }

    /// Convert to usize if the value is a representable non-negative count.
    pub fn to_usize(&self) -> Option<usize> {
        self.0.to_usize()
    }
}

/// Reduce a byte array to the minimal script-number encoding (OP_BIN2NUM).
pub fn minimally_encode(data: &[u8]) -> Vec<u8> {
    if data.is_empty() {
        return vec![];
    }
    let mut data = data.to_vec();
    let last = data[data.len() - 1];

    if last & 0x7f != 0 {
        return data;
    }
    if data.len() == 1 {
        return vec![];
    }
    if data[data.len() - 2] & 0x80 != 0 {
        return data;
    }

    let mut i = data.len() - 1;
    while i > 0 {
        if data[i - 1] != 0 {
            if data[i - 1] & 0x80 != 0 {
                data[i] = last;
                return data[..=i].to_vec();
            }
            data[i - 1] |= last;
            return data[..i].to_vec();
        }
        i -= 1;
    }
    vec![]
}
