//! Arithmetic and comparison operations.

use crate::error::{ScriptError, ScriptErrorKind};

use super::machine::Machine;
use super::scriptnum::ScriptNum;

impl<'a> Machine<'a> {
    pub(crate) fn op_unary(
        &mut self,
        f: impl FnOnce(&ScriptNum) -> ScriptNum,
    ) -> Result<(), ScriptError> {
        let n = self.stack.pop_num()?;
        self.stack.push_num(&f(&n))
    }

    pub(crate) fn op_binary(
        &mut self,
        f: impl FnOnce(&ScriptNum, &ScriptNum) -> ScriptNum,
    ) -> Result<(), ScriptError> {
        let b = self.stack.pop_num()?;
        let a = self.stack.pop_num()?;
        self.stack.push_num(&f(&a, &b))
    }

    pub(crate) fn op_bool_binary(
        &mut self,
        f: impl FnOnce(&ScriptNum, &ScriptNum) -> bool,
    ) -> Result<(), ScriptError> {
        let b = self.stack.pop_num()?;
        let a = self.stack.pop_num()?;
        let result = if f(&a, &b) { 1 } else { 0 };
        self.stack.push_num(&ScriptNum::from_i64(result))
    }

    /// Push whichever of the two operands `f` selects (OP_MIN / OP_MAX).
    pub(crate) fn op_bool_pick(
        &mut self,
        f: impl FnOnce(&ScriptNum, &ScriptNum) -> bool,
    ) -> Result<(), ScriptError> {
        let b = self.stack.pop_num()?;
        let a = self.stack.pop_num()?;
        if f(&a, &b) {
            self.stack.push_num(&a)
        } else {
            self.stack.push_num(&b)
        }
    }

    pub(crate) fn op_not(&mut self) -> Result<(), ScriptError> {
        let n = self.stack.pop_num()?;
        let result = if n.is_zero() { 1 } else { 0 };
        self.stack.push_num(&ScriptNum::from_i64(result))
    }

    pub(crate) fn op_0notequal(&mut self) -> Result<(), ScriptError> {
        let n = self.stack.pop_num()?;
        let result = if n.is_zero() { 0 } else { 1 };
        self.stack.push_num(&ScriptNum::from_i64(result))
    }

    pub(crate) fn op_div(&mut self) -> Result<(), ScriptError> {
        let b = self.stack.pop_num()?;
        let a = self.stack.pop_num()?;
        if b.is_zero() {
            return Err(ScriptError::new(
                ScriptErrorKind::DivideByZero,
                "division by zero",
            ));
        }
        self.stack.push_num(&a.div(&b))
    }

    pub(crate) fn op_mod(&mut self) -> Result<(), ScriptError> {
        let b = self.stack.pop_num()?;
        let a = self.stack.pop_num()?;
        if b.is_zero() {
            return Err(ScriptError::new(
                ScriptErrorKind::DivideByZero,
                "modulo by zero",
            ));
        }
        self.stack.push_num(&a.rem(&b))
    }

    pub(crate) fn op_numequalverify(&mut self) -> Result<(), ScriptError> {
        self.op_bool_binary(|a, b| a == b)?;
        self.op_verify_with(ScriptErrorKind::VerifyFailed, "OP_NUMEQUALVERIFY failed")
    }

    pub(crate) fn op_within(&mut self) -> Result<(), ScriptError> {
        let max = self.stack.pop_num()?;
        let min = self.stack.pop_num()?;
        let x = self.stack.pop_num()?;
        let result = if min <= x && x < max { 1 } else { 0 };
        self.stack.push_num(&ScriptNum::from_i64(result))
    }

    pub(crate) fn op_lshift(&mut self) -> Result<(), ScriptError> {
        let (n, data) = self.pop_shift_operands()?;
        let bit_shift = n % 8;
        let byte_shift = n / 8;
        let masks: [u8; 8] = [0xFF, 0x7F, 0x3F, 0x1F, 0x0F, 0x07, 0x03, 0x01];
        let mask = masks[bit_shift];
        let overflow = !mask;

        let mut out = vec![0u8; data.len()];
        for idx in (1..=data.len()).rev() {
            let i = idx - 1;
            if byte_shift <= i {
                let k = i - byte_shift;
                out[k] |= (data[i] & mask) << bit_shift;
                if k >= 1 && bit_shift > 0 {
                    out[k - 1] |= (data[i] & overflow) >> (8 - bit_shift);
                }
            }
        }
        self.stack.push(out)
    }

    pub(crate) fn op_rshift(&mut self) -> Result<(), ScriptError> {
        let (n, data) = self.pop_shift_operands()?;
        let bit_shift = n % 8;
        let byte_shift = n / 8;
        let masks: [u8; 8] = [0xFF, 0xFE, 0xFC, 0xF8, 0xF0, 0xE0, 0xC0, 0x80];
        let mask = masks[bit_shift];
        let overflow = !mask;

        let mut out = vec![0u8; data.len()];
        for (i, &b) in data.iter().enumerate() {
            let k = i + byte_shift;
            if k < data.len() {
                out[k] |= (b & mask) >> bit_shift;
            }
            if k + 1 < data.len() && bit_shift > 0 {
                out[k + 1] |= (b & overflow) << (8 - bit_shift);
            }
        }
        self.stack.push(out)
    }

    fn pop_shift_operands(&mut self) -> Result<(usize, Vec<u8>), ScriptError> {
        let n = self.stack.pop_num()?;
        let n = n.to_usize().ok_or_else(|| {
            ScriptError::new(ScriptErrorKind::BadOperand, "shift amount is negative")
        })?;
        let data = self.stack.pop()?;
        Ok((n, data))
    }
}
