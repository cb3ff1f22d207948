//! The transaction type: wire codecs, TXID, fee allocation, and signing.

use std::fmt;

use txkit_codec::{ByteReader, ByteWriter, Hash256, VarInt};
use txkit_merkle::MerklePath;

use crate::error::TransactionError;
use crate::fee::{self, ChangeDistribution, FeeModel};
use crate::input::TxInput;
use crate::output::TxOutput;

/// Marker bytes placed after the version field in Extended Format.
const EF_MARKER: [u8; 6] = [0x00, 0x00, 0x00, 0x00, 0x00, 0xEF];

/// A transaction.
///
/// Identity is the SHA-256d of the legacy serialization; the optional
/// `merkle_path` anchors a mined transaction to its block and is excluded
/// from the identity.
///
/// Lifecycle: created empty, inputs and outputs mutated freely, then
/// sealed by [`fee()`](Transaction::fee) (fixes change output values) and
/// [`sign()`](Transaction::sign) (materializes unlocking scripts). After
/// signing the object is ready for transport.
///
/// # Wire format (legacy)
///
/// | Field        | Size                  |
/// |--------------|-----------------------|
/// | version      | 4 bytes (LE)          |
/// | input count  | VarInt                |
/// | inputs       | variable (per input)  |
/// | output count | VarInt                |
/// | outputs      | variable (per output) |
/// | lock_time    | 4 bytes (LE)          |
#[derive(Clone, Debug)]
pub struct Transaction {
    /// Transaction format version.
    pub version: u32,
    /// Ordered inputs.
    pub inputs: Vec<TxInput>,
    /// Ordered outputs.
    pub outputs: Vec<TxOutput>,
    /// Lock time: block height or timestamp before which the transaction
    /// is invalid, when non-zero.
    pub lock_time: u32,
    /// Inclusion proof for a mined transaction.
    pub merkle_path: Option<MerklePath>,
}

impl Transaction {
    /// A new empty transaction, version 1.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
            merkle_path: None,
        }
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse from hex (legacy or Extended Format, auto-detected).
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| TransactionError::Serialization(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Parse from raw bytes (legacy or Extended Format, auto-detected).
    ///
    /// The slice must contain exactly one transaction; trailing data is an
    /// error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let extended = bytes.len() >= 10 && bytes[4..10] == EF_MARKER;
        let mut reader = ByteReader::new(bytes);
        let tx = if extended {
            Self::read_from_ef(&mut reader)?
        } else {
            Self::read_from(&mut reader)?
        };
        if reader.remaining() != 0 {
            return Err(TransactionError::Serialization(format!(
                "{} trailing bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a legacy transaction from a reader.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le()?;

        let input_count = reader.read_varint()?.value();
        let mut inputs = Vec::with_capacity(input_count as usize);
        for _ in 0..input_count {
            inputs.push(TxInput::read_from(reader)?);
        }

        let output_count = reader.read_varint()?.value();
        let mut outputs = Vec::with_capacity(output_count as usize);
        for _ in 0..output_count {
            outputs.push(TxOutput::read_from(reader)?);
        }

        let lock_time = reader.read_u32_le()?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
            merkle_path: None,
        })
    }

    /// Deserialize an Extended Format transaction from a reader.
    ///
    /// Each input additionally carries the source output's satoshis and
    /// locking script, making the transaction statelessly verifiable.
    pub fn read_from_ef(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le()?;
        let marker = reader.read_bytes(6)?;
        if marker != EF_MARKER {
            return Err(TransactionError::Serialization(
                "missing extended format marker".to_string(),
            ));
        }

        let input_count = reader.read_varint()?.value();
        let mut inputs = Vec::with_capacity(input_count as usize);
        for _ in 0..input_count {
            let mut input = TxInput::read_from(reader)?;
            let satoshis = reader.read_u64_le()?;
            let script_bytes = reader.read_var_bytes()?;
            input.set_source_output(Some(TxOutput::new(
                satoshis,
                txkit_script::Script::from_bytes(script_bytes),
            )));
            inputs.push(input);
        }

        let output_count = reader.read_varint()?.value();
        let mut outputs = Vec::with_capacity(output_count as usize);
        for _ in 0..output_count {
            outputs.push(TxOutput::read_from(reader)?);
        }

        let lock_time = reader.read_u32_le()?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
            merkle_path: None,
        })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Serialize to the legacy wire format.
    ///
    /// Every output's satoshi value must be resolved.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let mut writer = ByteWriter::with_capacity(256);
        writer.write_u32_le(self.version);

        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(&mut writer);
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut writer)?;
        }

        writer.write_u32_le(self.lock_time);
        Ok(writer.into_bytes())
    }

    /// Serialize to lowercase hex.
    pub fn to_hex(&self) -> Result<String, TransactionError> {
        Ok(hex::encode(self.to_bytes()?))
    }

    /// Serialize to Extended Format.
    ///
    /// Every input must know its source output (satoshis and locking
    /// script).
    pub fn to_ef_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let mut writer = ByteWriter::with_capacity(256);
        writer.write_u32_le(self.version);
        writer.write_bytes(&EF_MARKER);

        writer.write_varint(VarInt::from(self.inputs.len()));
        for (i, input) in self.inputs.iter().enumerate() {
            input.write_to(&mut writer);
            let source = input.source_output().ok_or_else(|| {
                TransactionError::UnresolvedSource(format!(
                    "input {} has no source output for extended format",
                    i
                ))
            })?;
            let satoshis = source.satoshis.ok_or(TransactionError::SignBeforeFee)?;
            writer.write_u64_le(satoshis);
            writer.write_var_bytes(source.locking_script.as_bytes());
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut writer)?;
        }

        writer.write_u32_le(self.lock_time);
        Ok(writer.into_bytes())
    }

    // -----------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------

    /// The TXID: SHA-256d of the legacy serialization, internal byte order.
    pub fn txid(&self) -> Result<Hash256, TransactionError> {
        Ok(Hash256::digest(&self.to_bytes()?))
    }

    /// The TXID as a display (byte-reversed) hex string.
    pub fn txid_hex(&self) -> Result<String, TransactionError> {
        Ok(self.txid()?.to_string())
    }

    /// Serialized byte length.
    pub fn size(&self) -> Result<usize, TransactionError> {
        Ok(self.to_bytes()?.len())
    }

    /// Size estimate used by the fee engine: unsigned inputs contribute
    /// their template's worst-case unlocking-script length.
    pub fn estimated_size(&self) -> usize {
        let mut size = 4 + 4;
        size += VarInt::from(self.inputs.len()).encoded_len();
        for input in &self.inputs {
            size += input.estimated_serialized_len();
        }
        size += VarInt::from(self.outputs.len()).encoded_len();
        for output in &self.outputs {
            size += output.serialized_len();
        }
        size
    }

    // -----------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------

    /// Append an input.
    pub fn add_input(&mut self, input: TxInput) {
        self.inputs.push(input);
    }

    /// Append an output.
    pub fn add_output(&mut self, output: TxOutput) {
        self.outputs.push(output);
    }

    /// Sum of the resolved output values.
    pub fn total_output_satoshis(&self) -> Result<u64, TransactionError> {
        let mut total = 0u64;
        for output in &self.outputs {
            total += output.satoshis.ok_or(TransactionError::SignBeforeFee)?;
        }
        Ok(total)
    }

    /// Sum of the source-output values across all inputs.
    pub fn total_input_satoshis(&self) -> Result<u64, TransactionError> {
        let mut total = 0u64;
        for (i, input) in self.inputs.iter().enumerate() {
            total += input.source_satoshis().ok_or_else(|| {
                TransactionError::UnresolvedSource(format!("input {} has no source info", i))
            })?;
        }
        Ok(total)
    }

    /// Whether this is a coinbase transaction.
    pub fn is_coinbase(&self) -> bool {
        if self.inputs.len() != 1 {
            return false;
        }
        let input = &self.inputs[0];
        input.source_txid.is_zero()
            && (input.source_output_index == 0xFFFF_FFFF || input.sequence == 0xFFFF_FFFF)
    }

    // -----------------------------------------------------------------
    // Sealing
    // -----------------------------------------------------------------

    /// Compute the fee and distribute change.
    ///
    /// Idempotent: change outputs (marked with the `change` flag) are
    /// re-solved from scratch on every call.
    pub fn fee(
        &mut self,
        model: &FeeModel,
        distribution: ChangeDistribution,
    ) -> Result<(), TransactionError> {
        fee::allocate(self, model, distribution)
    }

    /// Materialize every deferred unlocking script, in input order.
    ///
    /// Inputs that already carry a script are left untouched; an input
    /// with neither script nor template is an error. All output values
    /// must be resolved first.
    pub fn sign(&mut self) -> Result<(), TransactionError> {
        if self.outputs.iter().any(|o| o.satoshis.is_none()) {
            return Err(TransactionError::SignBeforeFee);
        }
        for i in 0..self.inputs.len() {
            if self.inputs[i].unlocking_script.is_some() {
                continue;
            }
            let template = self.inputs[i]
                .unlocking_script_template
                .clone()
                .ok_or_else(|| {
                    TransactionError::SigningMissingSource(format!(
                        "input {} has neither unlocking script nor template",
                        i
                    ))
                })?;
            let script = template.sign(self, i)?;
            self.inputs[i].unlocking_script = Some(script);
        }
        Ok(())
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Transaction {
    /// The hex serialization, or a placeholder while change is unresolved.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_hex() {
            Ok(hex_str) => write!(f, "{}", hex_str),
            Err(_) => write!(f, "<transaction with unresolved outputs>"),
        }
    }
}

/// Byte range of one script inside a serialized transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptSlice {
    /// Offset of the script's first byte.
    pub offset: usize,
    /// Script length in bytes.
    pub length: usize,
}

/// Script locations produced by [`parse_script_offsets`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOffsets {
    /// One slice per input's unlocking script.
    pub inputs: Vec<ScriptSlice>,
    /// One slice per output's locking script.
    pub outputs: Vec<ScriptSlice>,
}

/// Locate every script in a serialized legacy transaction without copying.
///
/// A preparser for callers that only need script byte ranges.
pub fn parse_script_offsets(bytes: &[u8]) -> Result<ScriptOffsets, TransactionError> {
    let mut reader = ByteReader::new(bytes);
    reader.read_u32_le()?;

    let input_count = reader.read_varint()?.value();
    let mut inputs = Vec::with_capacity(input_count as usize);
    for _ in 0..input_count {
        reader.read_bytes(36)?;
        let length = reader.read_varint()?.value() as usize;
        inputs.push(ScriptSlice {
            offset: reader.position(),
            length,
        });
        reader.read_bytes(length)?;
        reader.read_u32_le()?;
    }

    let output_count = reader.read_varint()?.value();
    let mut outputs = Vec::with_capacity(output_count as usize);
    for _ in 0..output_count {
        reader.read_u64_le()?;
        let length = reader.read_varint()?.value() as usize;
        outputs.push(ScriptSlice {
            offset: reader.position(),
            length,
        });
        reader.read_bytes(length)?;
    }

    reader.read_u32_le()?;
    Ok(ScriptOffsets { inputs, outputs })
}
