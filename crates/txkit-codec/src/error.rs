/// Error type for wire codec operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The input ended before the requested number of bytes could be read.
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        /// Bytes the reader attempted to consume.
        needed: usize,
        /// Bytes left in the input.
        remaining: usize,
    },

    /// A variable-length integer prefix promised more bytes than available.
    #[error("malformed varint: {0}")]
    MalformedVarInt(String),

    /// A hash value had the wrong length.
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}
