//! The `Script` type.
//!
//! A script is an ordered sequence of chunks stored as raw bytes. Parsers
//! accept any valid push encoding; the canonical binary form emitted by the
//! builder methods always uses the shortest push opcode.

use std::fmt;

use crate::chunk::{decode_script, push_data_prefix, ScriptChunk};
use crate::error::{ScriptError, ScriptErrorKind};
use crate::opcodes::*;

/// A Bitcoin script, a byte-vector newtype.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Script(Vec<u8>);

impl Script {
    /// Create an empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Decode a script from a hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        Ok(Script(hex::decode(hex_str)?))
    }

    /// Wrap a copy of raw script bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Build a script from parsed chunks, re-encoding every push canonically.
    pub fn from_chunks(chunks: &[ScriptChunk]) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        for chunk in chunks {
            match &chunk.data {
                Some(data) if chunk.op <= OP_PUSHDATA4 && chunk.op != OP_0 => {
                    script.append_push_data(data)?;
                }
                Some(data) => {
                    // OP_RETURN carries its trailing payload verbatim.
                    script.0.push(chunk.op);
                    script.0.extend_from_slice(data);
                }
                None => script.0.push(chunk.op),
            }
        }
        Ok(script)
    }

    /// Parse a space-separated ASM string.
    ///
    /// Tokens naming an opcode emit that opcode; any other token is decoded
    /// as hex and pushed.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        if asm.is_empty() {
            return Ok(script);
        }
        for token in asm.split(' ') {
            if let Some(op) = opcode_from_name(token) {
                script.append_opcode(op)?;
            } else {
                let data = hex::decode(token).map_err(|_| {
                    ScriptError::new(
                        ScriptErrorKind::Malformed,
                        format!("unknown ASM token: {}", token),
                    )
                })?;
                script.append_push_data(&data)?;
            }
        }
        Ok(script)
    }

    /// Render the script as ASM. Returns an empty string for malformed scripts.
    pub fn to_asm(&self) -> String {
        match self.chunks() {
            Ok(chunks) => {
                let parts: Vec<String> = chunks
                    .iter()
                    .map(|c| c.to_asm_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                parts.join(" ")
            }
            Err(_) => String::new(),
        }
    }

    /// Encode as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Borrow the underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Byte length of the script.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the script has no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse into chunks.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    /// Append a data push using the shortest push encoding.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append a single non-push opcode.
    pub fn append_opcode(&mut self, op: u8) -> Result<(), ScriptError> {
        if (OP_DATA_1..=OP_PUSHDATA4).contains(&op) {
            return Err(ScriptError::new(
                ScriptErrorKind::Malformed,
                format!("{} requires push data", opcode_name(op)),
            ));
        }
        self.0.push(op);
        Ok(())
    }

    /// Whether this is a P2PKH locking script
    /// (`OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG`).
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Whether this is a data-carrier script (`OP_RETURN` or
    /// `OP_FALSE OP_RETURN` prefix).
    pub fn is_data(&self) -> bool {
        let b = &self.0;
        (!b.is_empty() && b[0] == OP_RETURN) || (b.len() > 1 && b[0] == OP_FALSE && b[1] == OP_RETURN)
    }

    /// Extract the 20-byte public key hash from a P2PKH locking script.
    pub fn public_key_hash(&self) -> Result<Vec<u8>, ScriptError> {
        if !self.is_p2pkh() {
            return Err(ScriptError::new(
                ScriptErrorKind::Malformed,
                "not a P2PKH locking script",
            ));
        }
        Ok(self.0[3..23].to_vec())
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
