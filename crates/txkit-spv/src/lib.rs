//! SPV layer of the txkit transaction engine.
//!
//! Bundles transactions with their Merkle inclusion proofs in the BEEF
//! wire envelope, verifies source chains against a chain oracle, and
//! defines the pluggable broadcaster protocol.

pub mod beef;
pub mod broadcaster;
pub mod verify;

mod error;

pub use beef::{
    transaction_from_atomic_beef, transaction_from_beef, Beef, BeefEntry, EntryData,
    ATOMIC_BEEF_PREFIX, BEEF_V1, BEEF_V2,
};
pub use broadcaster::{
    default_broadcaster, BroadcastFailureCode, BroadcastResult, Broadcaster, HttpBroadcaster,
    TransactionBroadcastExt,
};
pub use error::SpvError;
pub use verify::{verify, SpvOptions, VerifyMode};
