//! Error types for the execution core.
//!
//! Every error here is local and recoverable: a failed operation leaves the
//! owning unit untouched and the caller decides whether to resubmit.

use thiserror::Error;

/// Instruction decode or execution failure reported by the register machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("No instruction entered")]
    EmptyInput,

    #[error("Unknown instruction: {0}")]
    UnknownInstruction(String),

    #[error("Invalid operands for {opcode}: {reason}")]
    InvalidOperand { opcode: &'static str, reason: String },

    #[error("Arithmetic overflow in {opcode}")]
    ArithmeticOverflow { opcode: &'static str },
}

impl DecodeError {
    pub(crate) fn operand(opcode: &'static str, reason: impl Into<String>) -> Self {
        DecodeError::InvalidOperand { opcode, reason: reason.into() }
    }
}

/// Program listing could not be turned into a steppable program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("line {line}: unsupported statement `{text}`")]
    Unsupported { line: usize, text: String },

    #[error("line {line}: unknown label `{label}`")]
    UnknownLabel { line: usize, label: String },

    #[error("line {line}: duplicate label `{label}`")]
    DuplicateLabel { line: usize, label: String },

    #[error("line {line}: branch target {target} outside program of {len} lines")]
    BranchOutOfRange { line: usize, target: usize, len: usize },
}

/// Trace file read/write failure.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("decompress error: {0}")]
    Decompress(String),

    #[error("file too small")]
    Truncated,

    #[error("invalid trace file (bad magic)")]
    BadMagic,

    #[error("unsupported trace version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
}
