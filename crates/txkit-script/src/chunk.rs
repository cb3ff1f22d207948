//! Chunk-level script parsing and push-data encoding.
//!
//! A chunk is either a standalone opcode or a data push carrying the push
//! opcode and its payload. Parsing accepts any valid push encoding; the
//! canonical encoder always emits the shortest one.

use crate::error::{ScriptError, ScriptErrorKind};
use crate::opcodes::*;

/// A single parsed element of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes) this is the length.
    pub op: u8,
    /// The data payload, present for push operations.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// Render this chunk as an ASM token.
    ///
    /// Pushes render as hex; other opcodes by name.
    pub fn to_asm_string(&self) -> String {
        if self.op > OP_0 && self.op <= OP_PUSHDATA4 {
            if let Some(ref data) = self.data {
                return hex::encode(data);
            }
        }
        opcode_name(self.op)
    }
}

fn truncated(what: &str) -> ScriptError {
    ScriptError::new(
        ScriptErrorKind::Malformed,
        format!("script truncated inside {}", what),
    )
}

/// Decode raw script bytes into chunks.
///
/// `OP_RETURN` outside a conditional block consumes the remainder of the
/// script as its payload.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;
    let mut conditional_depth: i32 = 0;

    while pos < bytes.len() {
        let op = bytes[pos];
        match op {
            OP_IF | OP_NOTIF | OP_VERIF | OP_VERNOTIF => {
                conditional_depth += 1;
                chunks.push(ScriptChunk { op, data: None });
                pos += 1;
            }
            OP_ENDIF => {
                conditional_depth -= 1;
                chunks.push(ScriptChunk { op, data: None });
                pos += 1;
            }
            OP_RETURN => {
                if conditional_depth > 0 {
                    chunks.push(ScriptChunk { op, data: None });
                    pos += 1;
                } else {
                    let data = bytes[pos + 1..].to_vec();
                    chunks.push(ScriptChunk {
                        op,
                        data: Some(data),
                    });
                    pos = bytes.len();
                }
            }
            OP_PUSHDATA1 => {
                if bytes.len() < pos + 2 {
                    return Err(truncated("OP_PUSHDATA1 length"));
                }
                let len = bytes[pos + 1] as usize;
                pos += 2;
                if bytes.len() < pos + len {
                    return Err(truncated("OP_PUSHDATA1 payload"));
                }
                chunks.push(ScriptChunk {
                    op,
                    data: Some(bytes[pos..pos + len].to_vec()),
                });
                pos += len;
            }
            OP_PUSHDATA2 => {
                if bytes.len() < pos + 3 {
                    return Err(truncated("OP_PUSHDATA2 length"));
                }
                let len = u16::from_le_bytes([bytes[pos + 1], bytes[pos + 2]]) as usize;
                pos += 3;
                if bytes.len() < pos + len {
                    return Err(truncated("OP_PUSHDATA2 payload"));
                }
                chunks.push(ScriptChunk {
                    op,
                    data: Some(bytes[pos..pos + len].to_vec()),
                });
                pos += len;
            }
            OP_PUSHDATA4 => {
                if bytes.len() < pos + 5 {
                    return Err(truncated("OP_PUSHDATA4 length"));
                }
                let len = u32::from_le_bytes([
                    bytes[pos + 1],
                    bytes[pos + 2],
                    bytes[pos + 3],
                    bytes[pos + 4],
                ]) as usize;
                pos += 5;
                if bytes.len() < pos + len {
                    return Err(truncated("OP_PUSHDATA4 payload"));
                }
                chunks.push(ScriptChunk {
                    op,
                    data: Some(bytes[pos..pos + len].to_vec()),
                });
                pos += len;
            }
            0x01..=0x4b => {
                let len = op as usize;
                if bytes.len() < pos + 1 + len {
                    return Err(truncated("direct push payload"));
                }
                chunks.push(ScriptChunk {
                    op,
                    data: Some(bytes[pos + 1..pos + 1 + len].to_vec()),
                });
                pos += 1 + len;
            }
            _ => {
                chunks.push(ScriptChunk { op, data: None });
                pos += 1;
            }
        }
    }

    Ok(chunks)
}

/// Compute the shortest push prefix for a payload of `data_len` bytes.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= 75 {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xFF {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xFFFF {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xFFFF_FFFF {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::new(
            ScriptErrorKind::Malformed,
            format!("push of {} bytes cannot be encoded", data_len),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_simple_pushes() {
        let bytes = hex::decode("05000102030401ff02abcd").unwrap();
        let chunks = decode_script(&bytes).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].data.as_deref(), Some(&[0, 1, 2, 3, 4][..]));
        assert_eq!(chunks[1].data.as_deref(), Some(&[0xff][..]));
    }

    #[test]
    fn decode_empty() {
        assert!(decode_script(&[]).unwrap().is_empty());
    }

    #[test]
    fn truncated_direct_push() {
        let bytes = hex::decode("05000000").unwrap();
        let err = decode_script(&bytes).unwrap_err();
        assert_eq!(err.kind, ScriptErrorKind::Malformed);
    }

    #[test]
    fn truncated_pushdata_prefixes() {
        assert!(decode_script(&[OP_PUSHDATA1]).is_err());
        assert!(decode_script(&[OP_PUSHDATA2]).is_err());
        assert!(decode_script(&[OP_PUSHDATA4]).is_err());
        assert!(decode_script(&[OP_PUSHDATA1, 0x05, 0x00]).is_err());
    }

    #[test]
    fn pushdata1_valid() {
        let data = b"testing";
        let mut bytes = vec![OP_PUSHDATA1, data.len() as u8];
        bytes.extend_from_slice(data);
        let chunks = decode_script(&bytes).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].op, OP_PUSHDATA1);
        assert_eq!(chunks[0].data.as_deref(), Some(&data[..]));
    }

    #[test]
    fn op_return_consumes_remainder() {
        let bytes = [OP_RETURN, 0xde, 0xad, 0xbe, 0xef];
        let chunks = decode_script(&bytes).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].data.as_deref(), Some(&[0xde, 0xad, 0xbe, 0xef][..]));
    }

    #[test]
    fn push_prefix_boundaries() {
        assert_eq!(push_data_prefix(75).unwrap(), vec![75]);
        assert_eq!(push_data_prefix(76).unwrap(), vec![OP_PUSHDATA1, 76]);
        assert_eq!(push_data_prefix(255).unwrap(), vec![OP_PUSHDATA1, 255]);
        assert_eq!(push_data_prefix(256).unwrap(), vec![OP_PUSHDATA2, 0x00, 0x01]);
        assert_eq!(push_data_prefix(65535).unwrap(), vec![OP_PUSHDATA2, 0xFF, 0xFF]);
        assert_eq!(
            push_data_prefix(65536).unwrap(),
            vec![OP_PUSHDATA4, 0x00, 0x00, 0x01, 0x00]
        );
    }
}
