//! Bridge from the script interpreter's signature checks to the
//! transaction model and the crypto oracle.

use txkit_script::{Script, ScriptError, ScriptErrorKind, SigContext};

use crate::crypto::CryptoOracle;
use crate::sighash::{self, SighashScope};
use crate::transaction::Transaction;

/// [`SigContext`] implementation over a transaction and an oracle.
///
/// OP_CHECKSIG hands the popped signature, public key, and the subscript
/// here; the context builds the SIGHASH preimage and asks the oracle to
/// verify.
pub struct TxSigContext<'a> {
    tx: &'a Transaction,
    oracle: &'a dyn CryptoOracle,
}

impl<'a> TxSigContext<'a> {
    /// Pair a transaction with a crypto oracle.
    pub fn new(tx: &'a Transaction, oracle: &'a dyn CryptoOracle) -> Self {
        TxSigContext { tx, oracle }
    }
}

impl<'a> SigContext for TxSigContext<'a> {
    fn check_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_index: usize,
    ) -> Result<bool, ScriptError> {
        if full_sig.is_empty() {
            return Ok(false);
        }
        let scope_byte = full_sig[full_sig.len() - 1];
        let der = &full_sig[..full_sig.len() - 1];

        let scope = SighashScope::from_byte(scope_byte).map_err(|_| {
            ScriptError::new(
                ScriptErrorKind::InvalidSighashFlag,
                format!("invalid sighash scope 0x{:02x}", scope_byte),
            )
        })?;

        let input = self.tx.inputs.get(input_index).ok_or_else(|| {
            ScriptError::new(
                ScriptErrorKind::BadOperand,
                format!("input index {} out of range", input_index),
            )
        })?;
        let source_satoshis = input.source_satoshis().ok_or_else(|| {
            ScriptError::new(
                ScriptErrorKind::BadOperand,
                format!("input {} has no source satoshis", input_index),
            )
        })?;

        let digest =
            sighash::signature_hash(self.tx, input_index, sub_script, source_satoshis, scope)
                .map_err(|e| {
                    ScriptError::new(ScriptErrorKind::BadOperand, format!("sighash failed: {}", e))
                })?;

        Ok(self
            .oracle
            .ecdsa_verify(pub_key, &digest, der)
            .unwrap_or(false))
    }

    fn lock_time(&self) -> u32 {
        self.tx.lock_time
    }

    fn version(&self) -> u32 {
        self.tx.version
    }

    fn input_sequence(&self, input_index: usize) -> u32 {
        self.tx
            .inputs
            .get(input_index)
            .map(|input| input.sequence)
            .unwrap_or(0xFFFF_FFFF)
    }
}
