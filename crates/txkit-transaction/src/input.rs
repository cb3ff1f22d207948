//! Transaction inputs.

use std::fmt;
use std::sync::Arc;

use txkit_codec::{ByteReader, ByteWriter, Hash256, VarInt};
use txkit_script::Script;

use crate::error::TransactionError;
use crate::output::TxOutput;
use crate::template::UnlockingScriptTemplate;
use crate::transaction::Transaction;

/// Default sequence: finalized, no relative lock time.
pub const DEFAULT_SEQUENCE: u32 = 0xFFFF_FFFF;

/// A single transaction input.
///
/// The spent output is referenced by TXID and index; the ancestor may also
/// be attached as a shared `source_transaction`, which the SPV verifier
/// walks and BEEF serialization bundles. The unlocking side is either a
/// materialized script or a deferred template the sign loop invokes.
///
/// # Wire format
///
/// | Field               | Size          |
/// |---------------------|---------------|
/// | source_txid         | 32 bytes (LE) |
/// | source_output_index | 4 bytes (LE)  |
/// | script length       | VarInt        |
/// | unlocking_script    | variable      |
/// | sequence            | 4 bytes (LE)  |
#[derive(Clone)]
pub struct TxInput {
    /// TXID of the transaction whose output is being spent.
    pub source_txid: Hash256,
    /// Index of the spent output within the source transaction.
    pub source_output_index: u32,
    /// Sequence number; defaults to [`DEFAULT_SEQUENCE`].
    pub sequence: u32,
    /// The materialized unlocking script, once signed or parsed.
    pub unlocking_script: Option<Script>,
    /// Deferred signer and length estimator, consumed by `fee()`/`sign()`.
    pub unlocking_script_template: Option<Arc<dyn UnlockingScriptTemplate>>,
    /// Shared handle to the resolved ancestor, when available.
    pub source_transaction: Option<Arc<Transaction>>,
    /// Direct source-output info when the full ancestor is absent
    /// (populated by Extended Format parsing).
    source_output: Option<TxOutput>,
}

impl TxInput {
    /// An input spending `source_txid:index` with no unlocking side yet.
    pub fn new(source_txid: Hash256, source_output_index: u32) -> Self {
        TxInput {
            source_txid,
            source_output_index,
            sequence: DEFAULT_SEQUENCE,
            unlocking_script: None,
            unlocking_script_template: None,
            source_transaction: None,
            source_output: None,
        }
    }

    /// An input spending an output of a resolved ancestor.
    ///
    /// The ancestor is shared, not owned; several inputs may hold the same
    /// `Arc`.
    pub fn from_source(
        source_transaction: Arc<Transaction>,
        source_output_index: u32,
    ) -> Result<Self, TransactionError> {
        let source_txid = source_transaction.txid()?;
        Ok(TxInput {
            source_txid,
            source_output_index,
            sequence: DEFAULT_SEQUENCE,
            unlocking_script: None,
            unlocking_script_template: None,
            source_transaction: Some(source_transaction),
            source_output: None,
        })
    }

    /// Attach a deferred unlocking template.
    pub fn with_template(mut self, template: Arc<dyn UnlockingScriptTemplate>) -> Self {
        self.unlocking_script_template = Some(template);
        self
    }

    /// Provide the spent output directly, without the full ancestor.
    pub fn set_source_output(&mut self, output: Option<TxOutput>) {
        self.source_output = output;
    }

    /// The spent output, if known: the direct slot first, then a lookup
    /// into the attached ancestor.
    pub fn source_output(&self) -> Option<&TxOutput> {
        if let Some(ref output) = self.source_output {
            return Some(output);
        }
        self.source_transaction
            .as_ref()
            .and_then(|tx| tx.outputs.get(self.source_output_index as usize))
    }

    /// Satoshi value of the spent output, if known.
    pub fn source_satoshis(&self) -> Option<u64> {
        self.source_output().and_then(|o| o.satoshis)
    }

    /// Locking script of the spent output, if known.
    pub fn source_locking_script(&self) -> Option<&Script> {
        self.source_output().map(|o| &o.locking_script)
    }

    /// Deserialize from the wire.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let source_txid = Hash256::from_slice(reader.read_bytes(32)?)?;
        let source_output_index = reader.read_u32_le()?;
        let script_bytes = reader.read_var_bytes()?;
        let sequence = reader.read_u32_le()?;

        let unlocking_script = if script_bytes.is_empty() {
            None
        } else {
            Some(Script::from_bytes(script_bytes))
        };

        Ok(TxInput {
            source_txid,
            source_output_index,
            sequence,
            unlocking_script,
            unlocking_script_template: None,
            source_transaction: None,
            source_output: None,
        })
    }

    /// Serialize to the wire. An unsigned input writes an empty script.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_bytes(self.source_txid.as_bytes());
        writer.write_u32_le(self.source_output_index);
        match &self.unlocking_script {
            Some(script) => writer.write_var_bytes(script.as_bytes()),
            None => writer.write_varint(VarInt(0)),
        }
        writer.write_u32_le(self.sequence);
    }

    /// Serialized byte length using the estimated unlocking-script size for
    /// unsigned inputs.
    pub fn estimated_serialized_len(&self) -> usize {
        let script_len = match (&self.unlocking_script, &self.unlocking_script_template) {
            (Some(script), _) => script.len(),
            (None, Some(template)) => template.estimate_length(),
            (None, None) => 0,
        };
        32 + 4 + VarInt::from(script_len).encoded_len() + script_len + 4
    }
}

impl fmt::Debug for TxInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxInput")
            .field("source_txid", &self.source_txid)
            .field("source_output_index", &self.source_output_index)
            .field("sequence", &self.sequence)
            .field("unlocking_script", &self.unlocking_script)
            .field(
                "unlocking_script_template",
                &self.unlocking_script_template.as_ref().map(|_| ".."),
            )
            .field("source_transaction", &self.source_transaction)
            .field("source_output", &self.source_output)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_roundtrip() {
        let mut input = TxInput::new(Hash256::new([0xAB; 32]), 3);
        input.unlocking_script = Some(Script::from_hex("0401020304").unwrap());
        input.sequence = 0xFFFF_FFFE;

        let mut writer = ByteWriter::new();
        input.write_to(&mut writer);
        let bytes = writer.into_bytes();

        let mut reader = ByteReader::new(&bytes);
        let decoded = TxInput::read_from(&mut reader).unwrap();
        assert_eq!(decoded.source_txid, input.source_txid);
        assert_eq!(decoded.source_output_index, 3);
        assert_eq!(decoded.sequence, 0xFFFF_FFFE);
        assert_eq!(decoded.unlocking_script, input.unlocking_script);
    }

    #[test]
    fn unsigned_input_writes_empty_script() {
        let input = TxInput::new(Hash256::default(), 0);
        let mut writer = ByteWriter::new();
        input.write_to(&mut writer);
        // 32 txid + 4 index + 1 zero-length varint + 4 sequence.
        assert_eq!(writer.len(), 41);
    }

    #[test]
    fn direct_source_output_takes_priority() {
        let mut input = TxInput::new(Hash256::default(), 0);
        assert!(input.source_output().is_none());
        input.set_source_output(Some(TxOutput::new(777, Script::new())));
        assert_eq!(input.source_satoshis(), Some(777));
    }
}
