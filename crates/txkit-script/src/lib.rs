//! Script model and interpreter for the txkit transaction engine.
//!
//! Provides the `Script` type with hex/ASM/binary round-trips, the opcode
//! table, chunk-level parsing, and a resource-bounded stack machine that
//! executes (unlocking, locking) script pairs with a configurable script
//! memory ceiling.

pub mod chunk;
pub mod interpreter;
pub mod opcodes;
pub mod script;

mod error;

pub use chunk::ScriptChunk;
pub use error::{ScriptError, ScriptErrorKind};
pub use interpreter::{verify_scripts, Limits, SigContext};
pub use script::Script;
