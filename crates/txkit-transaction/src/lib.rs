//! Transaction model for the txkit transaction engine.
//!
//! Provides the `Transaction` type with legacy and Extended Format wire
//! codecs, SIGHASH preimage construction, the crypto oracle interface,
//! unlocking-script templates (P2PKH shipped), and the fee and change
//! distribution engine.

pub mod context;
pub mod crypto;
pub mod fee;
pub mod input;
pub mod output;
pub mod sighash;
pub mod template;
pub mod transaction;

mod error;

pub use context::TxSigContext;
pub use crypto::{CryptoOracle, PrivateKey, Secp256k1Oracle};
pub use error::TransactionError;
pub use fee::{ChangeDistribution, FeeModel};
pub use input::TxInput;
pub use output::TxOutput;
pub use sighash::{SighashBase, SighashScope};
pub use transaction::{parse_script_offsets, ScriptOffsets, ScriptSlice, Transaction};

#[cfg(test)]
mod tests;
