use txkit_codec::Hash256;

/// Error type for BEEF parsing and SPV verification.
#[derive(Debug, thiserror::Error)]
pub enum SpvError {
    /// The four version bytes matched no known BEEF version.
    #[error("unknown BEEF version 0x{0:08x}")]
    UnknownBeefVersion(u32),

    /// A bundled transaction references a parent that is neither in the
    /// bundle nor mined.
    #[error("dangling BEEF reference to {0}")]
    DanglingReference(Hash256),

    /// The requested subject TXID is not present in the bundle.
    #[error("subject {0} missing from BEEF")]
    SubjectMissing(Hash256),

    /// Structural BEEF violation outside the tagged cases.
    #[error("invalid BEEF: {0}")]
    InvalidBeef(String),

    /// The source chain reached a root ancestor with no Merkle proof.
    #[error("unanchored chain at {0}")]
    UnanchoredChain(Hash256),

    /// An input's script pair failed interpretation.
    #[error("script failure on input {input_index}: {source}")]
    BadScript {
        /// Index of the failing input.
        input_index: usize,
        /// The interpreter's tagged error.
        source: txkit_script::ScriptError,
    },

    /// The chain oracle rejected a computed Merkle root.
    #[error("merkle root rejected for height {height}")]
    BadMerkleRoot {
        /// Height the root was checked against.
        height: u32,
    },

    /// The transaction pays less than the fee model requires.
    #[error("insufficient fee: {paid} paid, {required} required")]
    InsufficientFee {
        /// Fee the model demands.
        required: u64,
        /// Fee the transaction actually pays.
        paid: u64,
    },

    /// The chain oracle could not be reached; callers may retry.
    #[error(transparent)]
    Oracle(#[from] txkit_merkle::OracleError),

    /// Underlying Merkle path failure.
    #[error(transparent)]
    Merkle(#[from] txkit_merkle::MerkleError),

    /// Underlying transaction failure.
    #[error(transparent)]
    Transaction(#[from] txkit_transaction::TransactionError),

    /// Underlying codec failure.
    #[error(transparent)]
    Codec(#[from] txkit_codec::CodecError),
}
