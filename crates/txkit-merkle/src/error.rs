/// Error type for Merkle path operations.
#[derive(Debug, thiserror::Error)]
pub enum MerkleError {
    /// The path structure violates a BRC-74 invariant.
    #[error("invalid merkle path: {0}")]
    InvalidPath(String),

    /// Two paths could not be merged.
    #[error("cannot combine merkle paths: {0}")]
    CombineConflict(String),

    /// Underlying wire codec failure.
    #[error(transparent)]
    Codec(#[from] txkit_codec::CodecError),

    /// The chain oracle could not be reached.
    #[error(transparent)]
    Oracle(#[from] crate::tracker::OracleError),
}
