//! The chain oracle interface.

use txkit_codec::Hash256;

/// Failure of the external chain oracle.
///
/// Always transient from the core's point of view; callers may retry.
#[derive(Debug, thiserror::Error)]
#[error("chain oracle unavailable: {0}")]
pub struct OracleError(pub String);

/// Oracle over block headers.
///
/// A `true` return from [`is_valid_root_for_height`] is a trust assertion:
/// the oracle vouches that the given Merkle root is the one committed at
/// that height. Merkle roots for historical blocks are immutable, so
/// callers may cache results by `(root, height)`.
///
/// [`is_valid_root_for_height`]: ChainTracker::is_valid_root_for_height
pub trait ChainTracker {
    /// Whether `root` is the Merkle root of the block at `height`.
    fn is_valid_root_for_height(&self, root: &Hash256, height: u32) -> Result<bool, OracleError>;

    /// The current chain tip height.
    fn current_height(&self) -> Result<u32, OracleError>;
}
