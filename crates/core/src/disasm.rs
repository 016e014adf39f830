//! Instruction and state formatter.
//!
//! Converts decoded [`Instruction`] values back to canonical assembly text and
//! renders program listings for the step debugger.

use std::fmt;

use crate::opcodes::{Instruction, Operand};
use crate::stepper::Program;

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Imm(v) => write!(f, "#{}", v),
            Operand::Reg(r) => write!(f, "{}", r),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&disassemble(*self))
    }
}

/// Format a decoded instruction as an assembly string (e.g. `ADD #1, W2`).
pub fn disassemble(inst: Instruction) -> String {
    let m = inst.opcode().mnemonic();
    match inst {
        Instruction::Mov { src, dst }
        | Instruction::Add { src, dst }
        | Instruction::Sub { src, dst } => format!("{} {}, {}", m, src, dst),
        Instruction::Add3 { src, b, dst }
        | Instruction::Sub3 { src, b, dst } => format!("{} {}, {}, {}", m, src, b, dst),
        Instruction::Clr { dst } => format!("{} {}", m, dst),
    }
}

/// Program listing with a `>` marker on the line at `pc`.
///
/// When `pc` is past the end the last line keeps the marker, so the view
/// still points somewhere after the program finishes.
pub fn format_listing(program: &Program, pc: usize) -> Vec<String> {
    let last = program.len().saturating_sub(1);
    let mark = pc.min(last);
    program
        .lines()
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let cursor = if i == mark { '>' } else { ' ' };
            format!("{} {:2}: {}", cursor, i, line.text)
        })
        .collect()
}
