//! The script interpreter.
//!
//! A stack machine over byte strings. Two scripts execute in sequence, the
//! unlocking script (push-only) then the locking script, sharing the data
//! stack across the boundary. Resource use is bounded by [`Limits`]: a
//! script memory ceiling over both stacks, an optional opcode counter, and
//! the script-number length limit.
//!
//! Signature checking goes through the [`SigContext`] capability so this
//! crate stays independent of the transaction model; the transaction crate
//! supplies an implementation that builds the SIGHASH preimage and asks the
//! crypto oracle to verify.

pub mod limits;
pub mod machine;
pub mod parsed;
pub mod scriptnum;
pub mod stack;

mod ops_arith;
mod ops_crypto;
mod ops_data;
mod ops_flow;
mod ops_stack;

pub use limits::Limits;
pub use machine::Machine;
pub use scriptnum::ScriptNum;

use crate::error::ScriptError;
use crate::script::Script;

/// Transaction-side capability consumed by OP_CHECKSIG and friends.
///
/// `full_sig` carries the sighash scope byte at its end; `sub_script` is the
/// locking-script slice the signature commits to.
pub trait SigContext {
    /// Verify one signature against one public key for the given input.
    fn check_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_index: usize,
    ) -> Result<bool, ScriptError>;

    /// The transaction's lock time.
    fn lock_time(&self) -> u32;

    /// The transaction's version.
    fn version(&self) -> u32;

    /// The sequence number of the given input.
    fn input_sequence(&self, input_index: usize) -> u32;
}

/// Execute `unlocking` then `locking` and apply the final truth check.
///
/// Same inputs always produce the same result and terminal stack; script
/// failure is an `Err` value, never a panic.
pub fn verify_scripts(
    unlocking: &Script,
    locking: &Script,
    limits: &Limits,
    ctx: Option<&dyn SigContext>,
    input_index: usize,
) -> Result<(), ScriptError> {
    let mut machine = Machine::new(unlocking, locking, limits.clone(), ctx, input_index)?;
    machine.execute()
}
