//! The crypto oracle consumed by signing and verification.
//!
//! The engine never touches curve arithmetic directly; everything goes
//! through [`CryptoOracle`]. [`Secp256k1Oracle`] is the shipped
//! implementation over the `k256` crate, producing RFC-6979 deterministic,
//! low-S normalized DER signatures.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::error::TransactionError;

/// A 32-byte secp256k1 private key.
#[derive(Clone)]
pub struct PrivateKey([u8; 32]);

impl PrivateKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        PrivateKey(bytes)
    }

    /// Parse from big-endian hex.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let decoded = hex::decode(hex_str)
            .map_err(|e| TransactionError::Crypto(format!("invalid key hex: {}", e)))?;
        if decoded.len() != 32 {
            return Err(TransactionError::Crypto(format!(
                "private key must be 32 bytes, got {}",
                decoded.len()
            )));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&decoded);
        Ok(PrivateKey(bytes))
    }

    /// Borrow the key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        write!(f, "PrivateKey(..)")
    }
}

/// External elliptic-curve capability.
///
/// Implementations must be safe to call concurrently.
pub trait CryptoOracle {
    /// Sign a 32-byte digest, returning a low-S DER signature.
    fn ecdsa_sign(
        &self,
        private_key: &[u8; 32],
        digest: &[u8; 32],
    ) -> Result<Vec<u8>, TransactionError>;

    /// Verify a DER signature over a 32-byte digest.
    fn ecdsa_verify(
        &self,
        public_key: &[u8],
        digest: &[u8; 32],
        signature_der: &[u8],
    ) -> Result<bool, TransactionError>;

    /// Derive the 33-byte compressed public key.
    fn derive_public_key(&self, private_key: &[u8; 32]) -> Result<[u8; 33], TransactionError>;
}

/// Default oracle backed by `k256`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Oracle;

impl Secp256k1Oracle {
    fn signing_key(private_key: &[u8; 32]) -> Result<SigningKey, TransactionError> {
        SigningKey::from_bytes(k256::FieldBytes::from_slice(private_key))
            .map_err(|e| TransactionError::Crypto(format!("invalid private key: {}", e)))
    }
}

impl CryptoOracle for Secp256k1Oracle {
    fn ecdsa_sign(
        &self,
        private_key: &[u8; 32],
        digest: &[u8; 32],
    ) -> Result<Vec<u8>, TransactionError> {
        let key = Self::signing_key(private_key)?;
        let signature: Signature = key
            .sign_prehash(digest)
            .map_err(|e| TransactionError::Crypto(format!("signing failed: {}", e)))?;
        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(signature.to_der().as_bytes().to_vec())
    }

    fn ecdsa_verify(
        &self,
        public_key: &[u8],
        digest: &[u8; 32],
        signature_der: &[u8],
    ) -> Result<bool, TransactionError> {
        let key = VerifyingKey::from_sec1_bytes(public_key)
            .map_err(|e| TransactionError::Crypto(format!("invalid public key: {}", e)))?;
        let signature = match Signature::from_der(signature_der) {
            Ok(sig) => sig,
            Err(_) => return Ok(false),
        };
        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(key.verify_prehash(digest, &signature).is_ok())
    }

    fn derive_public_key(&self, private_key: &[u8; 32]) -> Result<[u8; 33], TransactionError> {
        let key = Self::signing_key(private_key)?;
        let point = key.verifying_key().to_encoded_point(true);
        let bytes = point.as_bytes();
        let mut out = [0u8; 33];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}
