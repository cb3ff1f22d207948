//! SIGHASH preimage construction.
//!
//! BIP-143-derived digest with the mandatory FORKID bit in the scope byte.
//! The preimage commits to the value being spent, so signatures stay valid
//! only for the exact output they consume.

use txkit_codec::digest::sha256d;
use txkit_codec::ByteWriter;
use txkit_script::Script;

use crate::error::TransactionError;
use crate::transaction::Transaction;

/// Replay-protection bit, mandatory in every scope byte.
pub const SIGHASH_FORKID: u8 = 0x40;
/// Scope bit excluding other inputs from the digest.
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;
/// The standard scope byte: ALL | FORKID.
pub const SIGHASH_ALL_FORKID: u8 = 0x41;

/// Which outputs a signature commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SighashBase {
    /// Commit to every output.
    All,
    /// Commit to no outputs.
    None,
    /// Commit to the output at the signed input's index.
    Single,
}

/// A validated sighash scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SighashScope {
    /// The output-commitment mode.
    pub base: SighashBase,
    /// When set, only the signed input is committed; others may be added.
    pub anyone_can_pay: bool,
}

impl Default for SighashScope {
    fn default() -> Self {
        SighashScope {
            base: SighashBase::All,
            anyone_can_pay: false,
        }
    }
}

impl SighashScope {
    /// Encode as a scope byte (FORKID always set).
    pub fn to_byte(self) -> u8 {
        let base = match self.base {
            SighashBase::All => 0x01,
            SighashBase::None => 0x02,
            SighashBase::Single => 0x03,
        };
        let acp = if self.anyone_can_pay {
            SIGHASH_ANYONECANPAY
        } else {
            0
        };
        base | SIGHASH_FORKID | acp
    }

    /// Validate and decode a scope byte.
    ///
    /// The base must be ALL, NONE, or SINGLE, the FORKID bit must be set,
    /// and no other bits may appear.
    pub fn from_byte(byte: u8) -> Result<Self, TransactionError> {
        if byte & SIGHASH_FORKID == 0 {
            return Err(TransactionError::InvalidSighashFlag(byte));
        }
        let base = match byte & !(SIGHASH_FORKID | SIGHASH_ANYONECANPAY) {
            0x01 => SighashBase::All,
            0x02 => SighashBase::None,
            0x03 => SighashBase::Single,
            _ => return Err(TransactionError::InvalidSighashFlag(byte)),
        };
        Ok(SighashScope {
            base,
            anyone_can_pay: byte & SIGHASH_ANYONECANPAY != 0,
        })
    }
}

/// Compute the digest to be signed for one input.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    sub_script: &Script,
    source_satoshis: u64,
    scope: SighashScope,
) -> Result<[u8; 32], TransactionError> {
    let preimage = preimage(tx, input_index, sub_script, source_satoshis, scope)?;
    Ok(sha256d(&preimage))
}

/// Build the raw SIGHASH preimage:
///
/// ```text
/// nVersion (4) | hashPrevouts (32) | hashSequence (32) | outpoint (36)
/// | subscript (var) | amount (8) | nSequence (4) | hashOutputs (32)
/// | nLockTime (4) | scope (4)
/// ```
pub fn preimage(
    tx: &Transaction,
    input_index: usize,
    sub_script: &Script,
    source_satoshis: u64,
    scope: SighashScope,
) -> Result<Vec<u8>, TransactionError> {
    let input = tx.inputs.get(input_index).ok_or_else(|| {
        TransactionError::Serialization(format!(
            "input index {} out of range ({} inputs)",
            input_index,
            tx.inputs.len()
        ))
    })?;

    let hash_prevouts = if scope.anyone_can_pay {
        [0u8; 32]
    } else {
        prevouts_hash(tx)
    };

    let hash_sequence = if scope.anyone_can_pay || scope.base != SighashBase::All {
        [0u8; 32]
    } else {
        sequence_hash(tx)
    };

    let hash_outputs = match scope.base {
        SighashBase::All => outputs_hash(tx, None)?,
        SighashBase::Single if input_index < tx.outputs.len() => {
            outputs_hash(tx, Some(input_index))?
        }
        // SINGLE beyond the last output, and NONE, commit to zero.
        _ => [0u8; 32],
    };

    let mut writer = ByteWriter::with_capacity(256);
    writer.write_u32_le(tx.version);
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);
    writer.write_bytes(input.source_txid.as_bytes());
    writer.write_u32_le(input.source_output_index);
    writer.write_var_bytes(sub_script.as_bytes());
    writer.write_u64_le(source_satoshis);
    writer.write_u32_le(input.sequence);
    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(scope.to_byte() as u32);

    Ok(writer.into_bytes())
}

fn prevouts_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        writer.write_bytes(input.source_txid.as_bytes());
        writer.write_u32_le(input.source_output_index);
    }
    sha256d(writer.as_bytes())
}

fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence);
    }
    sha256d(writer.as_bytes())
}

fn outputs_hash(tx: &Transaction, single: Option<usize>) -> Result<[u8; 32], TransactionError> {
    let mut writer = ByteWriter::new();
    match single {
        Some(index) => tx.outputs[index].write_to(&mut writer)?,
        None => {
            for output in &tx.outputs {
                output.write_to(&mut writer)?;
            }
        }
    }
    Ok(sha256d(writer.as_bytes()))
}
