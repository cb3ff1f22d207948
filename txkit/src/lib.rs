#![deny(missing_docs)]

//! txkit - client-side BSV transaction engine.
//!
//! Re-exports all engine crates for convenient single-crate usage.

pub use txkit_codec as codec;
pub use txkit_merkle as merkle;
pub use txkit_script as script;
pub use txkit_spv as spv;
pub use txkit_transaction as transaction;
