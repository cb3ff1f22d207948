#![deny(missing_docs)]

//! Merkle inclusion proofs (BRC-74 "BUMP" format) and the chain oracle
//! interface used to anchor them to block headers.

pub mod parent;
pub mod path;
pub mod tracker;

mod error;

pub use error::MerkleError;
pub use parent::merkle_parent;
pub use path::{MerklePath, PathLeaf};
pub use tracker::{ChainTracker, OracleError};
