/// Errors that abort decompilation of a single function.
///
/// None of these are recoverable at the point they occur. The script driver
/// catches them per function, records them, and moves on to the next one.
#[derive(Debug, thiserror::Error)]
pub enum DecompileError {
    #[error("stack underflow at {address:#06x}")]
    StackUnderflow { address: u32 },

    #[error("unknown opcode {opcode:#04x} at {address:#06x}")]
    UnknownOpcode { address: u32, opcode: u8 },

    #[error("unresolved jump target {dest:#06x} at {address:#06x}")]
    UnresolvedJumpTarget { address: u32, dest: u32 },

    #[error("malformed operand for opcode {opcode:#04x} at {address:#06x}: {message}")]
    MalformedOperand {
        address: u32,
        opcode: u8,
        message: String,
    },

    #[error("stack imbalance at {address:#06x}: {depth} value(s) left on the stack")]
    StackImbalance { address: u32, depth: usize },

    #[error("bytecode error: {0}")]
    Format(#[from] fieldscript::Error),
}

impl DecompileError {
    /// Short, stable name of the error kind (for diagnostics and reports).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StackUnderflow { .. } => "StackUnderflow",
            Self::UnknownOpcode { .. } => "UnknownOpcode",
            Self::UnresolvedJumpTarget { .. } => "UnresolvedJumpTarget",
            Self::MalformedOperand { .. } => "MalformedOperand",
            Self::StackImbalance { .. } => "StackImbalance",
            Self::Format(_) => "Format",
        }
    }
}

pub type DecompileResult<T> = std::result::Result<T, DecompileError>;
