//! The script execution machine.
//!
//! Executes the unlocking script then the locking script over a shared pair
//! of stacks, enforcing push-only unlocking scripts, the script memory
//! ceiling, and the opcode counter.

use crate::error::{ScriptError, ScriptErrorKind};
use crate::opcodes::*;
use crate::script::Script;

use super::limits::Limits;
use super::parsed::{is_push_only, parse_script, ParsedOp, ParsedScript};
use super::scriptnum::ScriptNum;
use super::stack::{Branch, ControlStack, MemoryBudget, Stack};
use super::SigContext;

/// Result of dispatching one opcode.
pub(crate) enum Flow {
    /// Keep executing the current script.
    Continue,
    /// End the current script successfully (OP_RETURN at top level).
    FinishScript,
}

/// Interpreter state for one (unlocking, locking) evaluation.
pub struct Machine<'a> {
    pub(crate) stack: Stack,
    pub(crate) alt: Stack,
    pub(crate) control: ControlStack,
    pub(crate) limits: Limits,
    scripts: Vec<ParsedScript>,
    script_idx: usize,
    pub(crate) pc: usize,
    pub(crate) last_code_sep: Option<usize>,
    pub(crate) op_count: usize,
    early_return: bool,
    pub(crate) ctx: Option<&'a dyn SigContext>,
    pub(crate) input_index: usize,
}

impl<'a> Machine<'a> {
    /// Prepare a machine over an (unlocking, locking) script pair.
    ///
    /// The unlocking script must be push-only; a non-push opcode aborts
    /// before execution starts.
    pub fn new(
        unlocking: &Script,
        locking: &Script,
        limits: Limits,
        ctx: Option<&'a dyn SigContext>,
        input_index: usize,
    ) -> Result<Self, ScriptError> {
        let unlock_ops = parse_script(unlocking)?;
        let lock_ops = parse_script(locking)?;

        if !is_push_only(&unlock_ops) {
            return Err(ScriptError::new(
                ScriptErrorKind::PushOnlyRequired,
                "unlocking script contains a non-push opcode",
            ));
        }

        let budget = MemoryBudget::new(limits.max_stack_memory);
        let stack = Stack::new(budget.clone(), limits.max_number_length);
        let alt = Stack::new(budget, limits.max_number_length);

        let scripts = vec![unlock_ops, lock_ops];
        let mut machine = Machine {
            stack,
            alt,
            control: ControlStack::new(),
            limits,
            scripts,
            script_idx: 0,
            pc: 0,
            last_code_sep: None,
            op_count: 0,
            early_return: false,
            ctx,
            input_index,
        };
        machine.skip_empty_scripts();
        Ok(machine)
    }

    /// Run to completion and apply the final truth check.
    pub fn execute(&mut self) -> Result<(), ScriptError> {
        while self.script_idx < self.scripts.len() {
            self.step()?;
        }
        self.final_check()
    }

    /// Execute the opcode at the current program counter.
    fn step(&mut self) -> Result<(), ScriptError> {
        let op = self.scripts[self.script_idx][self.pc].clone();
        let pc = self.pc;

        match self.execute_opcode(&op).map_err(|e| e.locate(pc))? {
            Flow::Continue => {
                self.pc += 1;
                if self.pc < self.scripts[self.script_idx].len() {
                    return Ok(());
                }
            }
            Flow::FinishScript => {}
        }

        if !self.control.is_empty() {
            return Err(ScriptError::new(
                ScriptErrorKind::ControlStackMismatch,
                "end of script reached inside a conditional",
            )
            .locate(pc));
        }
        self.advance_script();
        Ok(())
    }

    fn advance_script(&mut self) {
        // The alt stack does not persist across the script boundary.
        self.alt.clear();
        self.pc = 0;
        self.op_count = 0;
        self.last_code_sep = None;
        self.early_return = false;
        self.script_idx += 1;
        self.skip_empty_scripts();
    }

    fn skip_empty_scripts(&mut self) {
        while self.script_idx < self.scripts.len() && self.scripts[self.script_idx].is_empty() {
            self.script_idx += 1;
        }
    }

    fn final_check(&mut self) -> Result<(), ScriptError> {
        if self.stack.depth() == 0 {
            return Err(ScriptError::new(
                ScriptErrorKind::StackUnderflow,
                "stack empty at end of script execution",
            ));
        }
        if !self.stack.pop_bool()? {
            return Err(ScriptError::new(
                ScriptErrorKind::VerifyFailed,
                "false stack entry at end of script execution",
            ));
        }
        Ok(())
    }

    /// Whether the current path (branch state and early-return state) runs.
    pub(crate) fn executing(&self) -> bool {
        self.control.executing() && !self.early_return
    }

    /// Charge `n` operations against the opcode-count ceiling.
    pub(crate) fn bump_op_count(&mut self, n: usize) -> Result<(), ScriptError> {
        self.op_count += n;
        if let Some(max) = self.limits.max_ops {
            if self.op_count > max {
                return Err(ScriptError::new(
                    ScriptErrorKind::OpCountExceeded,
                    format!("opcode count exceeded the ceiling of {}", max),
                ));
            }
        }
        Ok(())
    }

    fn execute_opcode(&mut self, op: &ParsedOp) -> Result<Flow, ScriptError> {
        if op.opcode > OP_16 {
            self.bump_op_count(1)?;
        }

        // Non-executing paths still track conditional nesting.
        if !self.executing() && !op.is_conditional() {
            return Ok(Flow::Continue);
        }

        self.dispatch(op)
    }

    fn dispatch(&mut self, op: &ParsedOp) -> Result<Flow, ScriptError> {
        match op.opcode {
            OP_0 => self.stack.push(vec![])?,
            byte if (OP_DATA_1..=OP_PUSHDATA4).contains(&byte) => {
                self.stack.push(op.data.clone())?;
            }
            OP_1NEGATE => self.stack.push(vec![0x81])?,
            byte if (OP_1..=OP_16).contains(&byte) => {
                self.stack.push(vec![byte - (OP_1 - 1)])?;
            }

            OP_NOP => {}
            OP_IF => self.op_if(false)?,
            OP_NOTIF => self.op_if(true)?,
            OP_VERIF | OP_VERNOTIF => {
                return Err(self.reserved(op));
            }
            OP_ELSE => self.control.on_else()?,
            OP_ENDIF => self.control.on_endif()?,
            OP_VERIFY => self.op_verify_with(ScriptErrorKind::VerifyFailed, "OP_VERIFY failed")?,
            OP_RETURN => return self.op_return(),

            OP_CHECKLOCKTIMEVERIFY => self.op_check_locktime_verify()?,
            OP_CHECKSEQUENCEVERIFY => self.op_check_sequence_verify()?,

            OP_TOALTSTACK => self.op_to_alt_stack()?,
            OP_FROMALTSTACK => self.op_from_alt_stack()?,
            OP_2DROP => self.stack.drop_n(2)?,
            OP_2DUP => self.stack.dup_n(2)?,
            OP_3DUP => self.stack.dup_n(3)?,
            OP_2OVER => self.stack.over_n(2)?,
            OP_2ROT => self.stack.rot_n(2)?,
            OP_2SWAP => self.stack.swap_n(2)?,
            OP_IFDUP => self.op_ifdup()?,
            OP_DEPTH => {
                let depth = self.stack.depth() as i64;
                self.stack.push_num(&ScriptNum::from_i64(depth))?;
            }
            OP_DROP => self.stack.drop_n(1)?,
            OP_DUP => self.stack.dup_n(1)?,
            OP_NIP => {
                self.stack.remove(1)?;
            }
            OP_OVER => self.stack.over_n(1)?,
            OP_PICK => self.op_pick()?,
            OP_ROLL => self.op_roll()?,
            OP_ROT => self.stack.rot_n(1)?,
            OP_SWAP => self.stack.swap_n(1)?,
            OP_TUCK => self.stack.tuck()?,

            OP_CAT => self.op_cat()?,
            OP_SPLIT => self.op_split()?,
            OP_NUM2BIN => self.op_num2bin()?,
            OP_BIN2NUM => self.op_bin2num()?,
            OP_SIZE => self.op_size()?,

            OP_INVERT => self.op_invert()?,
            OP_AND => self.op_bitwise(|a, b| a & b)?,
            OP_OR => self.op_bitwise(|a, b| a | b)?,
            OP_XOR => self.op_bitwise(|a, b| a ^ b)?,
            OP_EQUAL => self.op_equal()?,
            OP_EQUALVERIFY => self.op_equalverify()?,
            OP_RESERVED | OP_VER | OP_RESERVED1 | OP_RESERVED2 => {
                return Err(self.reserved(op));
            }

            OP_1ADD => self.op_unary(|n| n.add(&ScriptNum::from_i64(1)))?,
            OP_1SUB => self.op_unary(|n| n.sub(&ScriptNum::from_i64(1)))?,
            OP_2MUL | OP_2DIV => {
                return Err(ScriptError::new(
                    ScriptErrorKind::DisabledOpcode,
                    format!("attempt to execute disabled opcode {}", op.name()),
                ));
            }
            OP_NEGATE => self.op_unary(|n| n.neg())?,
            OP_ABS => self.op_unary(|n| n.abs())?,
            OP_NOT => self.op_not()?,
            OP_0NOTEQUAL => self.op_0notequal()?,
            OP_ADD => self.op_binary(|a, b| a.add(b))?,
            OP_SUB => self.op_binary(|a, b| a.sub(b))?,
            OP_MUL => self.op_binary(|a, b| a.mul(b))?,
            OP_DIV => self.op_div()?,
            OP_MOD => self.op_mod()?,
            OP_LSHIFT => self.op_lshift()?,
            OP_RSHIFT => self.op_rshift()?,
            OP_BOOLAND => self.op_bool_binary(|a, b| !a.is_zero() && !b.is_zero())?,
            OP_BOOLOR => self.op_bool_binary(|a, b| !a.is_zero() || !b.is_zero())?,
            OP_NUMEQUAL => self.op_bool_binary(|a, b| a == b)?,
            OP_NUMEQUALVERIFY => self.op_numequalverify()?,
            OP_NUMNOTEQUAL => self.op_bool_binary(|a, b| a != b)?,
            OP_LESSTHAN => self.op_bool_binary(|a, b| a < b)?,
            OP_GREATERTHAN => self.op_bool_binary(|a, b| a > b)?,
            OP_LESSTHANOREQUAL => self.op_bool_binary(|a, b| a <= b)?,
            OP_GREATERTHANOREQUAL => self.op_bool_binary(|a, b| a >= b)?,
            OP_MIN => self.op_bool_pick(|a, b| a < b)?,
            OP_MAX => self.op_bool_pick(|a, b| a > b)?,
            OP_WITHIN => self.op_within()?,

            OP_RIPEMD160 | OP_SHA1 | OP_SHA256 | OP_HASH160 | OP_HASH256 => {
                self.op_hash(op.opcode)?;
            }
            OP_CODESEPARATOR => {
                self.last_code_sep = Some(self.pc);
            }
            OP_CHECKSIG => self.op_checksig()?,
            OP_CHECKSIGVERIFY => {
                self.op_checksig()?;
                self.op_verify_with(ScriptErrorKind::VerifyFailed, "OP_CHECKSIGVERIFY failed")?;
            }
            OP_CHECKMULTISIG => self.op_checkmultisig()?,
            OP_CHECKMULTISIGVERIFY => {
                self.op_checkmultisig()?;
                self.op_verify_with(
                    ScriptErrorKind::VerifyFailed,
                    "OP_CHECKMULTISIGVERIFY failed",
                )?;
            }

            OP_NOP1 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9 | OP_NOP10 => {}

            _ => {
                return Err(self.reserved(op));
            }
        }
        Ok(Flow::Continue)
    }

    fn reserved(&self, op: &ParsedOp) -> ScriptError {
        ScriptError::new(
            ScriptErrorKind::ReservedOpcode,
            format!("attempt to execute reserved opcode {}", op.name()),
        )
    }

    fn op_return(&mut self) -> Result<Flow, ScriptError> {
        if self.control.is_empty() {
            return Ok(Flow::FinishScript);
        }
        self.early_return = true;
        Ok(Flow::Continue)
    }

    /// The current script from just past the most recent OP_CODESEPARATOR.
    pub(crate) fn sub_script(&self) -> ParsedScript {
        let script = &self.scripts[self.script_idx];
        match self.last_code_sep {
            Some(idx) => script[idx + 1..].to_vec(),
            None => script.clone(),
        }
    }

    pub(crate) fn branch_state_for_if(&mut self, negate: bool) -> Result<Branch, ScriptError> {
        if !self.executing() {
            return Ok(Branch::ElseTaken);
        }
        let taken = self.stack.pop_bool()?;
        Ok(if taken != negate {
            Branch::Taken
        } else {
            Branch::Skipped
        })
    }

    fn op_if(&mut self, negate: bool) -> Result<(), ScriptError> {
        let state = self.branch_state_for_if(negate)?;
        self.control.push(state);
        Ok(())
    }
}
