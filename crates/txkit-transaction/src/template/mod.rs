//! Unlocking-script templates.
//!
//! A template is the deferred unlocking side of an input: a signer the
//! sign loop invokes, plus a worst-case length estimate the fee engine
//! uses before any signature exists.

pub mod p2pkh;

use txkit_script::Script;

use crate::error::TransactionError;
use crate::transaction::Transaction;

/// Deferred builder for an input's unlocking script.
///
/// Supplied per-input as a shared capability; the fee engine calls
/// [`estimate_length`](UnlockingScriptTemplate::estimate_length) and the
/// sign loop calls [`sign`](UnlockingScriptTemplate::sign) in input order.
pub trait UnlockingScriptTemplate {
    /// Produce the unlocking script for `input_index` of `tx`.
    fn sign(&self, tx: &Transaction, input_index: usize) -> Result<Script, TransactionError>;

    /// Worst-case byte length of the script [`sign`] will produce.
    ///
    /// [`sign`]: UnlockingScriptTemplate::sign
    fn estimate_length(&self) -> usize;
}
