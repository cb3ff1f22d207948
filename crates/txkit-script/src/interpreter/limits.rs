//! Resource ceilings for script execution.

/// Default script memory ceiling: 100 MB, suitable for trusted validation.
pub const DEFAULT_STACK_MEMORY: usize = 100 * 1024 * 1024;

/// Memory ceiling recommended when validating transactions received over
/// the wire.
pub const UNTRUSTED_STACK_MEMORY: usize = 1024 * 1024;

/// Default byte-length limit for script numbers.
pub const DEFAULT_NUMBER_LENGTH: usize = 4;

/// Byte-length limit for CHECKLOCKTIMEVERIFY / CHECKSEQUENCEVERIFY operands.
pub const LOCKTIME_NUMBER_LENGTH: usize = 5;

/// Resource bounds applied to a single script evaluation.
///
/// The script memory ceiling bounds the sum of byte lengths of every element
/// live on the data and alt stacks; it is the primary defense against
/// push/dup explosion.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Ceiling on the combined byte size of both stacks.
    pub max_stack_memory: usize,
    /// Ceiling on executed non-push opcodes, `None` for unbounded.
    pub max_ops: Option<usize>,
    /// Maximum byte length of a script-number operand.
    pub max_number_length: usize,
    /// Maximum number of public keys accepted by OP_CHECKMULTISIG.
    pub max_multisig_keys: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_stack_memory: DEFAULT_STACK_MEMORY,
            max_ops: None,
            max_number_length: DEFAULT_NUMBER_LENGTH,
            max_multisig_keys: 20,
        }
    }
}

impl Limits {
    /// Limits for validating untrusted input received over the wire.
    pub fn untrusted() -> Self {
        Limits {
            max_stack_memory: UNTRUSTED_STACK_MEMORY,
            ..Limits::default()
        }
    }

    /// Replace the script memory ceiling.
    pub fn with_stack_memory(mut self, bytes: usize) -> Self {
        self.max_stack_memory = bytes;
        self
    }

    /// Replace the opcode-count ceiling.
    pub fn with_max_ops(mut self, ops: usize) -> Self {
        self.max_ops = Some(ops);
        self
    }

    /// Replace the script-number length limit.
    pub fn with_number_length(mut self, bytes: usize) -> Self {
        self.max_number_length = bytes;
        self
    }
}
