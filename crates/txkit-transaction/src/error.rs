/// Error type for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// An input references a source transaction or output that is not
    /// resolved in memory.
    #[error("unresolved source: {0}")]
    UnresolvedSource(String),

    /// Inputs do not cover the outputs plus the computed fee.
    #[error("insufficient funds: {required} required, {available} available")]
    InsufficientFunds {
        /// Satoshis needed for outputs plus fee.
        required: u64,
        /// Satoshis provided by the inputs.
        available: u64,
    },

    /// The fee solver could not reach a self-consistent allocation.
    #[error("fee solver did not converge")]
    FeeSolverDidNotConverge,

    /// `sign()` or serialization was attempted while an output's satoshi
    /// value was still undefined.
    #[error("change outputs are unresolved; call fee() before sign()")]
    SignBeforeFee,

    /// Signing needed source-output information the input does not carry.
    #[error("signing requires source output info: {0}")]
    SigningMissingSource(String),

    /// A sighash scope byte had invalid bits.
    #[error("invalid sighash flag 0x{0:02x}")]
    InvalidSighashFlag(u8),

    /// Wire-format violation outside plain truncation.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Underlying codec failure.
    #[error(transparent)]
    Codec(#[from] txkit_codec::CodecError),

    /// Underlying script failure.
    #[error(transparent)]
    Script(#[from] txkit_script::ScriptError),

    /// The crypto oracle rejected an operation.
    #[error("crypto error: {0}")]
    Crypto(String),
}
