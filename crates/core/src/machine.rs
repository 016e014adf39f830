//! Register machine: one decoded instruction per call.
//!
//! Execution is all-or-nothing. The result is computed against the current
//! register file first and written back only when every operand resolved and
//! the arithmetic stayed inside `i64`, so a failed instruction never leaves a
//! partial update behind. There are no status flags.

use crate::error::DecodeError;
use crate::opcodes::{self, Instruction, Operand};
use crate::registers::{Reg, RegisterFile};

/// Register machine state.
#[derive(Debug, Clone, Default)]
pub struct RegisterMachine {
    regs: RegisterFile,
    /// Number of successfully executed instructions since reset
    pub executed: u64,
}

impl RegisterMachine {
    pub fn new() -> Self {
        RegisterMachine { regs: RegisterFile::new(), executed: 0 }
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn reg(&self, r: Reg) -> i64 {
        self.regs.get(r)
    }

    pub fn reset(&mut self) {
        self.regs.reset();
        self.executed = 0;
    }

    /// Execute a single decoded instruction.
    pub fn execute(&mut self, inst: &Instruction) -> Result<(), DecodeError> {
        let value = self.evaluate(inst)?;
        let dst = inst.destination();
        self.regs.set(dst, value);
        self.executed += 1;
        log::trace!("{} -> {} = {}", inst, dst, value);
        Ok(())
    }

    /// Decode a line of text and execute it. Returns the decoded instruction
    /// so the caller can echo the normalized form.
    pub fn execute_line(&mut self, line: &str) -> Result<Instruction, DecodeError> {
        let inst = opcodes::decode(line)?;
        self.execute(&inst)?;
        Ok(inst)
    }

    #[inline(always)]
    fn resolve(&self, op: Operand) -> i64 {
        match op {
            Operand::Imm(v) => v,
            Operand::Reg(r) => self.regs.get(r),
        }
    }

    /// Compute the value written to the destination without touching state.
    fn evaluate(&self, inst: &Instruction) -> Result<i64, DecodeError> {
        let overflow = || DecodeError::ArithmeticOverflow { opcode: inst.opcode().mnemonic() };
        match *inst {
            Instruction::Mov { src, .. } => Ok(self.resolve(src)),
            Instruction::Add { src, dst } => {
                self.regs.get(dst).checked_add(self.resolve(src)).ok_or_else(overflow)
            }
            Instruction::Sub { src, dst } => {
                self.regs.get(dst).checked_sub(self.resolve(src)).ok_or_else(overflow)
            }
            Instruction::Add3 { src, b, .. } => {
                self.resolve(src).checked_add(self.regs.get(b)).ok_or_else(overflow)
            }
            Instruction::Sub3 { src, b, .. } => {
                self.resolve(src).checked_sub(self.regs.get(b)).ok_or_else(overflow)
            }
            Instruction::Clr { .. } => Ok(0),
        }
    }
}
