//! Tagged script error with the originating opcode index.

use std::fmt;

/// Classification of script failures.
///
/// Script failure is a common, expected outcome; these are returned as
/// values, never raised by unwinding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptErrorKind {
    /// The script bytes or a push prefix could not be parsed.
    Malformed,
    /// An operation needed more stack elements than were present.
    StackUnderflow,
    /// The combined byte length of all stack elements exceeded the ceiling.
    StackMemoryExceeded,
    /// The unlocking script contained a non-push opcode.
    PushOnlyRequired,
    /// A disabled opcode was executed.
    DisabledOpcode,
    /// A reserved or unassigned opcode was executed.
    ReservedOpcode,
    /// A signature's sighash scope byte had invalid bits.
    InvalidSighashFlag,
    /// A signature was not strict low-S DER.
    InvalidSignatureEncoding,
    /// A public key was not a valid SEC1 encoding.
    InvalidPublicKey,
    /// A numeric operand exceeded the script-number length limit.
    NumericOverflow,
    /// Division or modulo by zero.
    DivideByZero,
    /// Unbalanced or misused IF/ELSE/ENDIF nesting.
    ControlStackMismatch,
    /// A VERIFY-class opcode (or final stack check) saw a false value.
    VerifyFailed,
    /// An operand was structurally invalid for its opcode.
    BadOperand,
    /// The non-push opcode counter exceeded its configured ceiling.
    OpCountExceeded,
    /// CHECKLOCKTIMEVERIFY / CHECKSEQUENCEVERIFY requirement not met.
    LockTimeUnsatisfied,
}

impl fmt::Display for ScriptErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A script failure tagged with its kind and the opcode that raised it.
#[derive(Debug, Clone)]
pub struct ScriptError {
    /// What went wrong.
    pub kind: ScriptErrorKind,
    /// Index of the opcode being executed when the error arose, when known.
    pub opcode_index: Option<usize>,
    /// Human-readable detail.
    pub reason: String,
}

impl ScriptError {
    /// Create an error with no opcode position.
    pub fn new(kind: ScriptErrorKind, reason: impl Into<String>) -> Self {
        ScriptError {
            kind,
            opcode_index: None,
            reason: reason.into(),
        }
    }

    /// Attach an opcode index if one is not already recorded.
    pub(crate) fn locate(mut self, opcode_index: usize) -> Self {
        if self.opcode_index.is_none() {
            self.opcode_index = Some(opcode_index);
        }
        self
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode_index {
            Some(idx) => write!(f, "{} at opcode {}: {}", self.kind, idx, self.reason),
            None => write!(f, "{}: {}", self.kind, self.reason),
        }
    }
}

impl std::error::Error for ScriptError {}

impl From<hex::FromHexError> for ScriptError {
    fn from(e: hex::FromHexError) -> Self {
        ScriptError::new(ScriptErrorKind::Malformed, format!("invalid hex: {}", e))
    }
}
