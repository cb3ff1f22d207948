//! Splice, bitwise, and equality operations.

use crate::error::{ScriptError, ScriptErrorKind};

use super::machine::Machine;
use super::scriptnum::{minimally_encode, ScriptNum};

impl<'a> Machine<'a> {
    pub(crate) fn op_cat(&mut self) -> Result<(), ScriptError> {
        let b = self.stack.pop()?;
        let mut a = self.stack.pop()?;
        a.extend_from_slice(&b);
        self.stack.push(a)
    }

    pub(crate) fn op_split(&mut self) -> Result<(), ScriptError> {
        let n = self.stack.pop_num()?;
        let data = self.stack.pop()?;
        let pos = n.to_usize().ok_or_else(|| {
            ScriptError::new(ScriptErrorKind::BadOperand, "split position is negative")
        })?;
        if pos > data.len() {
            return Err(ScriptError::new(
                ScriptErrorKind::BadOperand,
                format!("split position {} beyond element of {} bytes", pos, data.len()),
            ));
        }
        let right = data[pos..].to_vec();
        let left = data[..pos].to_vec();
        self.stack.push(left)?;
        self.stack.push(right)
    }

    pub(crate) fn op_num2bin(&mut self) -> Result<(), ScriptError> {
        let size = self.stack.pop_num()?;
        let data = self.stack.pop()?;

        let target = size.to_usize().ok_or_else(|| {
            ScriptError::new(ScriptErrorKind::BadOperand, "NUM2BIN size is negative")
        })?;
        // Bound the allocation before building the padded array.
        if target > self.limits.max_stack_memory {
            return Err(ScriptError::new(
                ScriptErrorKind::StackMemoryExceeded,
                format!(
                    "NUM2BIN size {} exceeds the stack memory ceiling {}",
                    target, self.limits.max_stack_memory
                ),
            ));
        }

        let num = ScriptNum::from_bytes(&data, data.len().max(1))?;
        let mut out = num.to_bytes();
        if target < out.len() {
            return Err(ScriptError::new(
                ScriptErrorKind::BadOperand,
                format!("value of {} bytes cannot fit {}", out.len(), target),
            ));
        }
        if target > out.len() {
            let mut sign = 0x00u8;
            if let Some(last) = out.last_mut() {
                sign = *last & 0x80;
                *last &= 0x7f;
            }
            while out.len() + 1 < target {
                out.push(0x00);
            }
            out.push(sign);
        }
        self.stack.push(out)
    }

    pub(crate) fn op_bin2num(&mut self) -> Result<(), ScriptError> {
        let data = self.stack.pop()?;
        let minimal = minimally_encode(&data);
        if minimal.len() > self.limits.max_number_length {
            return Err(ScriptError::new(
                ScriptErrorKind::NumericOverflow,
                format!(
                    "BIN2NUM result of {} bytes exceeds the numeric limit of {}",
                    minimal.len(),
                    self.limits.max_number_length
                ),
            ));
        }
        self.stack.push(minimal)
    }

    pub(crate) fn op_size(&mut self) -> Result<(), ScriptError> {
        let top = self.stack.peek(0)?;
        self.stack.push_num(&ScriptNum::from_i64(top.len() as i64))
    }

    pub(crate) fn op_invert(&mut self) -> Result<(), ScriptError> {
        let data = self.stack.pop()?;
        let inverted: Vec<u8> = data.iter().map(|b| !b).collect();
        self.stack.push(inverted)
    }

    pub(crate) fn op_bitwise(&mut self, f: fn(u8, u8) -> u8) -> Result<(), ScriptError> {
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        if a.len() != b.len() {
            return Err(ScriptError::new(
                ScriptErrorKind::BadOperand,
                format!("bitwise operands differ in length: {} vs {}", a.len(), b.len()),
            ));
        }
        let out: Vec<u8> = a.iter().zip(b.iter()).map(|(&x, &y)| f(x, y)).collect();
        self.stack.push(out)
    }

    pub(crate) fn op_equal(&mut self) -> Result<(), ScriptError> {
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        self.stack.push_bool(a == b)
    }

    pub(crate) fn op_equalverify(&mut self) -> Result<(), ScriptError> {
        self.op_equal()?;
        self.op_verify_with(ScriptErrorKind::VerifyFailed, "OP_EQUALVERIFY failed")
    }
}
