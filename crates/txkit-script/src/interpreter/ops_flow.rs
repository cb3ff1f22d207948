//! Verify and lock-time operations.

use crate::error::{ScriptError, ScriptErrorKind};

use super::limits::LOCKTIME_NUMBER_LENGTH;
use super::machine::Machine;
use super::scriptnum::ScriptNum;

/// Lock times below this are block heights; at or above, Unix timestamps.
const LOCK_TIME_THRESHOLD: i64 = 500_000_000;

const FINAL_SEQUENCE: u32 = 0xFFFF_FFFF;
const SEQUENCE_LOCK_TIME_DISABLED: i64 = 1 << 31;
const SEQUENCE_LOCK_TIME_IS_SECONDS: i64 = 1 << 22;
const SEQUENCE_LOCK_TIME_MASK: i64 = 0x0000_FFFF;

impl<'a> Machine<'a> {
    pub(crate) fn op_verify_with(
        &mut self,
        kind: ScriptErrorKind,
        reason: &str,
    ) -> Result<(), ScriptError> {
        if self.stack.pop_bool()? {
            Ok(())
        } else {
            Err(ScriptError::new(kind, reason.to_string()))
        }
    }

    pub(crate) fn op_check_locktime_verify(&mut self) -> Result<(), ScriptError> {
        let ctx = match self.ctx {
            Some(ctx) => ctx,
            // Without a transaction there is nothing to check against.
            None => return Ok(()),
        };

        let operand = self.stack.peek(0)?;
        let lock_time = ScriptNum::from_bytes(&operand, LOCKTIME_NUMBER_LENGTH)?;
        if lock_time.is_negative() {
            return Err(ScriptError::new(
                ScriptErrorKind::LockTimeUnsatisfied,
                format!("negative lock time {}", lock_time.to_i64()),
            ));
        }

        verify_lock_time(
            ctx.lock_time() as i64,
            LOCK_TIME_THRESHOLD,
            lock_time.to_i64(),
        )?;

        if ctx.input_sequence(self.input_index) == FINAL_SEQUENCE {
            return Err(ScriptError::new(
                ScriptErrorKind::LockTimeUnsatisfied,
                "input is finalized; lock time cannot be enforced",
            ));
        }
        Ok(())
    }

    pub(crate) fn op_check_sequence_verify(&mut self) -> Result<(), ScriptError> {
        let ctx = match self.ctx {
            Some(ctx) => ctx,
            None => return Ok(()),
        };

        let operand = self.stack.peek(0)?;
        let stack_seq = ScriptNum::from_bytes(&operand, LOCKTIME_NUMBER_LENGTH)?;
        if stack_seq.is_negative() {
            return Err(ScriptError::new(
                ScriptErrorKind::LockTimeUnsatisfied,
                format!("negative sequence {}", stack_seq.to_i64()),
            ));
        }

        let sequence = stack_seq.to_i64();
        if sequence & SEQUENCE_LOCK_TIME_DISABLED != 0 {
            return Ok(());
        }

        if ctx.version() < 2 {
            return Err(ScriptError::new(
                ScriptErrorKind::LockTimeUnsatisfied,
                format!("transaction version {} has no relative lock time", ctx.version()),
            ));
        }

        let tx_sequence = ctx.input_sequence(self.input_index) as i64;
        if tx_sequence & SEQUENCE_LOCK_TIME_DISABLED != 0 {
            return Err(ScriptError::new(
                ScriptErrorKind::LockTimeUnsatisfied,
                format!("input sequence 0x{:x} has relative lock time disabled", tx_sequence),
            ));
        }

        let mask = SEQUENCE_LOCK_TIME_IS_SECONDS | SEQUENCE_LOCK_TIME_MASK;
        verify_lock_time(
            tx_sequence & mask,
            SEQUENCE_LOCK_TIME_IS_SECONDS,
            sequence & mask,
        )
    }
}

fn verify_lock_time(tx_lock_time: i64, threshold: i64, lock_time: i64) -> Result<(), ScriptError> {
    if (tx_lock_time < threshold) != (lock_time < threshold) {
        return Err(ScriptError::new(
            ScriptErrorKind::LockTimeUnsatisfied,
            format!(
                "mismatched lock time types: tx {} vs operand {}",
                tx_lock_time, lock_time
            ),
        ));
    }
    if lock_time > tx_lock_time {
        return Err(ScriptError::new(
            ScriptErrorKind::LockTimeUnsatisfied,
            format!("lock time {} > transaction lock time {}", lock_time, tx_lock_time),
        ));
    }
    Ok(())
}
