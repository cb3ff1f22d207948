//! Pay-to-Public-Key-Hash template.
//!
//! Locking: `OP_DUP OP_HASH160 <20-byte hash> OP_EQUALVERIFY OP_CHECKSIG`.
//! Unlocking: `<DER signature || scope byte> <compressed public key>`.

use std::sync::Arc;

use txkit_script::opcodes::*;
use txkit_script::Script;

use crate::crypto::{CryptoOracle, PrivateKey, Secp256k1Oracle};
use crate::error::TransactionError;
use crate::sighash::{self, SighashScope};
use crate::template::UnlockingScriptTemplate;
use crate::transaction::Transaction;

/// Worst-case unlocking script length:
/// 1 + 72 (DER) + 1 (scope) + 1 + 33 (compressed key) = 108.
const ESTIMATED_UNLOCK_LEN: usize = 108;

/// Build the P2PKH locking script for a public key hash.
pub fn lock(public_key_hash: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(25);
    bytes.push(OP_DUP);
    bytes.push(OP_HASH160);
    bytes.push(OP_DATA_20);
    bytes.extend_from_slice(public_key_hash);
    bytes.push(OP_EQUALVERIFY);
    bytes.push(OP_CHECKSIG);
    Script::from_bytes(&bytes)
}

/// Create a P2PKH unlocker over the default crypto oracle.
///
/// `scope` defaults to ALL | FORKID.
pub fn unlock(private_key: PrivateKey, scope: Option<SighashScope>) -> P2pkhUnlocker {
    P2pkhUnlocker {
        private_key,
        scope: scope.unwrap_or_default(),
        oracle: Arc::new(Secp256k1Oracle),
    }
}

/// Create a P2PKH unlocker with an explicit crypto oracle.
pub fn unlock_with_oracle(
    private_key: PrivateKey,
    scope: Option<SighashScope>,
    oracle: Arc<dyn CryptoOracle>,
) -> P2pkhUnlocker {
    P2pkhUnlocker {
        private_key,
        scope: scope.unwrap_or_default(),
        oracle,
    }
}

/// P2PKH signer holding a private key and sighash scope.
pub struct P2pkhUnlocker {
    private_key: PrivateKey,
    scope: SighashScope,
    oracle: Arc<dyn CryptoOracle>,
}

impl UnlockingScriptTemplate for P2pkhUnlocker {
    fn sign(&self, tx: &Transaction, input_index: usize) -> Result<Script, TransactionError> {
        let input = tx.inputs.get(input_index).ok_or_else(|| {
            TransactionError::SigningMissingSource(format!(
                "input index {} out of range ({} inputs)",
                input_index,
                tx.inputs.len()
            ))
        })?;

        let source = input.source_output().ok_or_else(|| {
            TransactionError::SigningMissingSource(format!(
                "input {} has no source output info",
                input_index
            ))
        })?;
        let source_satoshis = source.satoshis.ok_or_else(|| {
            TransactionError::SigningMissingSource(format!(
                "input {} source output has no satoshi value",
                input_index
            ))
        })?;
        let sub_script = source.locking_script.clone();

        let digest = sighash::signature_hash(
            tx,
            input_index,
            &sub_script,
            source_satoshis,
            self.scope,
        )?;

        let der = self
            .oracle
            .ecdsa_sign(self.private_key.as_bytes(), &digest)?;
        let public_key = self.oracle.derive_public_key(self.private_key.as_bytes())?;

        let mut signature = Vec::with_capacity(der.len() + 1);
        signature.extend_from_slice(&der);
        signature.push(self.scope.to_byte());

        let mut script = Script::new();
        script.append_push_data(&signature)?;
        script.append_push_data(&public_key)?;
        Ok(script)
    }

    fn estimate_length(&self) -> usize {
        ESTIMATED_UNLOCK_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txkit_codec::digest::hash160;

    #[test]
    fn lock_shape() {
        let pkh = [0xE2; 20];
        let script = lock(&pkh);
        assert_eq!(script.len(), 25);
        assert!(script.is_p2pkh());
        assert_eq!(script.public_key_hash().unwrap(), pkh.to_vec());
    }

    #[test]
    fn lock_matches_derived_key() {
        let oracle = Secp256k1Oracle;
        let key = PrivateKey::from_bytes([0x42; 32]);
        let public_key = oracle.derive_public_key(key.as_bytes()).unwrap();
        let script = lock(&hash160(&public_key));
        assert!(script.is_p2pkh());
    }

    #[test]
    fn estimate_is_worst_case() {
        let unlocker = unlock(PrivateKey::from_bytes([0x42; 32]), None);
        assert_eq!(unlocker.estimate_length(), 108);
    }
}
