//! SPV verification of a transaction and its source chain.
//!
//! Walks the ancestry downward: a mined ancestor is validated through its
//! Merkle path against the chain oracle and the walk stops there; an
//! unmined ancestor must itself verify and still expose the spent output.
//! Every input of every unmined transaction runs its (unlocking, locking)
//! pair through the interpreter under the configured memory ceiling.

use std::collections::HashSet;

use txkit_codec::Hash256;
use txkit_merkle::ChainTracker;
use txkit_script::{verify_scripts, Limits};
use txkit_transaction::{CryptoOracle, FeeModel, Transaction, TxSigContext};

use crate::error::SpvError;

/// Verification depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    /// Validate scripts and Merkle anchoring only.
    ScriptsOnly,
    /// Additionally require each unmined transaction to pay its fee.
    Full,
}

/// Options for [`verify`].
#[derive(Debug, Clone)]
pub struct SpvOptions {
    /// Verification depth.
    pub mode: VerifyMode,
    /// Fee model for [`VerifyMode::Full`]; defaults to 1 sat/KB.
    pub fee_model: Option<FeeModel>,
    /// Script memory ceiling; defaults to the untrusted-input ceiling.
    pub script_memory_limit: Option<usize>,
}

impl Default for SpvOptions {
    fn default() -> Self {
        SpvOptions {
            mode: VerifyMode::ScriptsOnly,
            fee_model: None,
            script_memory_limit: None,
        }
    }
}

/// Verify `tx` and its source chain against the chain oracle.
pub fn verify(
    tx: &Transaction,
    tracker: &dyn ChainTracker,
    oracle: &dyn CryptoOracle,
    options: &SpvOptions,
) -> Result<(), SpvError> {
    let limits = match options.script_memory_limit {
        Some(bytes) => Limits::untrusted().with_stack_memory(bytes),
        None => Limits::untrusted(),
    };
    let mut verified: HashSet<Hash256> = HashSet::new();
    verify_tx(tx, tracker, oracle, options, &limits, &mut verified)
}

fn verify_tx(
    tx: &Transaction,
    tracker: &dyn ChainTracker,
    oracle: &dyn CryptoOracle,
    options: &SpvOptions,
    limits: &Limits,
    verified: &mut HashSet<Hash256>,
) -> Result<(), SpvError> {
    let txid = tx.txid()?;
    if verified.contains(&txid) {
        return Ok(());
    }

    // A mined transaction is anchored by its inclusion proof; nothing
    // below it needs to be walked.
    if let Some(ref path) = tx.merkle_path {
        if path.contains_txid(&txid) {
            let root = path.compute_root(&txid)?;
            if tracker.is_valid_root_for_height(&root, path.block_height)? {
                verified.insert(txid);
                return Ok(());
            }
            return Err(SpvError::BadMerkleRoot {
                height: path.block_height,
            });
        }
    }

    if tx.inputs.is_empty() {
        return Err(SpvError::UnanchoredChain(txid));
    }

    for (input_index, input) in tx.inputs.iter().enumerate() {
        let source = input
            .source_transaction
            .as_ref()
            .ok_or(SpvError::UnanchoredChain(input.source_txid))?;

        verify_tx(source, tracker, oracle, options, limits, verified)?;

        // The spent output must still exist at the referenced index.
        let source_output = source
            .outputs
            .get(input.source_output_index as usize)
            .ok_or_else(|| {
                SpvError::InvalidBeef(format!(
                    "input {} references missing output {} of {}",
                    input_index, input.source_output_index, input.source_txid
                ))
            })?;

        let unlocking = input.unlocking_script.as_ref().ok_or_else(|| {
            SpvError::BadScript {
                input_index,
                source: txkit_script::ScriptError::new(
                    txkit_script::ScriptErrorKind::Malformed,
                    "input has no unlocking script",
                ),
            }
        })?;

        let ctx = TxSigContext::new(tx, oracle);
        verify_scripts(
            unlocking,
            &source_output.locking_script,
            limits,
            Some(&ctx),
            input_index,
        )
        .map_err(|source| SpvError::BadScript {
            input_index,
            source,
        })?;
    }

    if options.mode == VerifyMode::Full {
        let model = options.fee_model.unwrap_or_default();
        let paid = tx
            .total_input_satoshis()?
            .saturating_sub(tx.total_output_satoshis()?);
        let required = model.fee_for_size(tx.size()?);
        if paid < required {
            return Err(SpvError::InsufficientFee { required, paid });
        }
    }

    verified.insert(txid);
    Ok(())
}
