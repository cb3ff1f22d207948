//! Transaction outputs.

use txkit_codec::{ByteReader, ByteWriter};
use txkit_script::Script;

use crate::error::TransactionError;

/// A single transaction output.
///
/// `satoshis` is `None` while the output is a change placeholder awaiting
/// the fee engine; every output must be resolved before serialization.
///
/// # Wire format
///
/// | Field          | Size         |
/// |----------------|--------------|
/// | satoshis       | 8 bytes (LE) |
/// | script length  | VarInt       |
/// | locking_script | variable     |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    /// Value in satoshis; `None` marks a change placeholder.
    pub satoshis: Option<u64>,
    /// The locking script defining the spending conditions.
    pub locking_script: Script,
    /// Marks this output as a change recipient for the fee engine.
    /// Local-only; never serialized.
    pub change: bool,
}

impl TxOutput {
    /// A resolved output with a known value.
    pub fn new(satoshis: u64, locking_script: Script) -> Self {
        TxOutput {
            satoshis: Some(satoshis),
            locking_script,
            change: false,
        }
    }

    /// A change placeholder whose value the fee engine will assign.
    pub fn change(locking_script: Script) -> Self {
        TxOutput {
            satoshis: None,
            locking_script,
            change: true,
        }
    }

    /// Deserialize from the wire.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let satoshis = reader.read_u64_le()?;
        let script_bytes = reader.read_var_bytes()?;
        Ok(TxOutput {
            satoshis: Some(satoshis),
            locking_script: Script::from_bytes(script_bytes),
            change: false,
        })
    }

    /// Serialize to the wire. Fails while the value is unresolved.
    pub fn write_to(&self, writer: &mut ByteWriter) -> Result<(), TransactionError> {
        let satoshis = self.satoshis.ok_or(TransactionError::SignBeforeFee)?;
        writer.write_u64_le(satoshis);
        writer.write_var_bytes(self.locking_script.as_bytes());
        Ok(())
    }

    /// Serialized byte length, using the current script and an 8-byte value.
    pub fn serialized_len(&self) -> usize {
        let script_len = self.locking_script.len();
        8 + txkit_codec::VarInt::from(script_len).encoded_len() + script_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let output = TxOutput::new(
            1500,
            Script::from_hex("76a914eb0bd5edba389198e73f8efabddfc61666969ff788ac").unwrap(),
        );
        let mut writer = ByteWriter::new();
        output.write_to(&mut writer).unwrap();
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), output.serialized_len());

        let mut reader = ByteReader::new(&bytes);
        let decoded = TxOutput::read_from(&mut reader).unwrap();
        assert_eq!(decoded, output);
    }

    #[test]
    fn unresolved_change_does_not_serialize() {
        let output = TxOutput::change(Script::new());
        let mut writer = ByteWriter::new();
        assert!(matches!(
            output.write_to(&mut writer),
            Err(TransactionError::SignBeforeFee)
        ));
    }
}
