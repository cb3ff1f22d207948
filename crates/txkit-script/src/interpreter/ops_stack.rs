//! Stack manipulation operations.

use crate::error::{ScriptError, ScriptErrorKind};

use super::machine::Machine;
use super::stack::as_bool;

impl<'a> Machine<'a> {
    pub(crate) fn op_to_alt_stack(&mut self) -> Result<(), ScriptError> {
        let item = self.stack.pop()?;
        self.alt.push(item)
    }

    pub(crate) fn op_from_alt_stack(&mut self) -> Result<(), ScriptError> {
        let item = self.alt.pop()?;
        self.stack.push(item)
    }

    pub(crate) fn op_ifdup(&mut self) -> Result<(), ScriptError> {
        let top = self.stack.peek(0)?;
        if as_bool(&top) {
            self.stack.push(top)?;
        }
        Ok(())
    }

    pub(crate) fn op_pick(&mut self) -> Result<(), ScriptError> {
        let n = self.pop_stack_index()?;
        self.stack.pick(n)
    }

    pub(crate) fn op_roll(&mut self) -> Result<(), ScriptError> {
        let n = self.pop_stack_index()?;
        self.stack.roll(n)
    }

    fn pop_stack_index(&mut self) -> Result<usize, ScriptError> {
        let n = self.stack.pop_num()?;
        n.to_usize().ok_or_else(|| {
            ScriptError::new(
                ScriptErrorKind::BadOperand,
                format!("stack index {} is not a valid depth", n.to_i64()),
            )
        })
    }
}
