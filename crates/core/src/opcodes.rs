//! Instruction decoder for the teaching ALU.
//!
//! Decodes one line of assembly text (`MOV #5, W0`, `ADD W1, W2, W3`, ...)
//! into a typed [`Instruction`]. Only four opcodes exist: `MOV`, `ADD`, `SUB`
//! and `CLR`. Operand order follows the dsPIC-style source-first convention,
//! so the destination is always the last operand.
//!
//! Accepted forms:
//!
//! | Form                 | Effect                     |
//! |----------------------|----------------------------|
//! | `MOV src, Wd`        | `Wd = src`                 |
//! | `ADD src, Wd`        | `Wd = Wd + src`            |
//! | `ADD src, Wb, Wd`    | `Wd = src + Wb`            |
//! | `SUB src, Wd`        | `Wd = Wd - src`            |
//! | `SUB src, Wb, Wd`    | `Wd = src - Wb`            |
//! | `CLR Wd`             | `Wd = 0`                   |
//!
//! `src` is either an immediate (`#12`, `#-3`, `#0x1F`) or a register.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::registers::Reg;

/// Source operand: immediate literal or register reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Imm(i64),
    Reg(Reg),
}

/// Opcode mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    Mov,
    Add,
    Sub,
    Clr,
}

impl Opcode {
    pub fn from_mnemonic(s: &str) -> Option<Opcode> {
        match s {
            "MOV" => Some(Opcode::Mov),
            "ADD" => Some(Opcode::Add),
            "SUB" => Some(Opcode::Sub),
            "CLR" => Some(Opcode::Clr),
            _ => None,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Mov => "MOV",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Clr => "CLR",
        }
    }
}

/// Decoded instruction with operands.
///
/// Operand kinds are already validated: every destination is a [`Reg`], so
/// an instruction value can only name registers that exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    Mov { src: Operand, dst: Reg },
    Add { src: Operand, dst: Reg },
    Add3 { src: Operand, b: Reg, dst: Reg },
    Sub { src: Operand, dst: Reg },
    Sub3 { src: Operand, b: Reg, dst: Reg },
    Clr { dst: Reg },
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Mov { .. } => Opcode::Mov,
            Instruction::Add { .. } | Instruction::Add3 { .. } => Opcode::Add,
            Instruction::Sub { .. } | Instruction::Sub3 { .. } => Opcode::Sub,
            Instruction::Clr { .. } => Opcode::Clr,
        }
    }

    /// The single register this instruction writes.
    pub fn destination(&self) -> Reg {
        match *self {
            Instruction::Mov { dst, .. }
            | Instruction::Add { dst, .. }
            | Instruction::Add3 { dst, .. }
            | Instruction::Sub { dst, .. }
            | Instruction::Sub3 { dst, .. }
            | Instruction::Clr { dst } => dst,
        }
    }
}

/// Split a raw input line into uppercase tokens. Commas count as whitespace.
pub fn tokenize(line: &str) -> Vec<String> {
    line.trim()
        .to_uppercase()
        .replace(',', " ")
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

/// Decode one line of assembly text.
pub fn decode(line: &str) -> Result<Instruction, DecodeError> {
    let tokens = tokenize(line);
    let (head, ops) = match tokens.split_first() {
        Some(t) => t,
        None => return Err(DecodeError::EmptyInput),
    };
    let opcode = Opcode::from_mnemonic(head)
        .ok_or_else(|| DecodeError::UnknownInstruction(head.clone()))?;
    let m = opcode.mnemonic();

    match (opcode, ops) {
        (Opcode::Mov, [src, dst]) => Ok(Instruction::Mov {
            src: parse_operand(m, src)?,
            dst: parse_register(m, dst)?,
        }),
        (Opcode::Mov, _) => Err(arity(m, "2", ops.len())),

        (Opcode::Add, [src, dst]) => Ok(Instruction::Add {
            src: parse_operand(m, src)?,
            dst: parse_register(m, dst)?,
        }),
        (Opcode::Add, [src, b, dst]) => Ok(Instruction::Add3 {
            src: parse_operand(m, src)?,
            b: parse_register(m, b)?,
            dst: parse_register(m, dst)?,
        }),
        (Opcode::Sub, [src, dst]) => Ok(Instruction::Sub {
            src: parse_operand(m, src)?,
            dst: parse_register(m, dst)?,
        }),
        (Opcode::Sub, [src, b, dst]) => Ok(Instruction::Sub3 {
            src: parse_operand(m, src)?,
            b: parse_register(m, b)?,
            dst: parse_register(m, dst)?,
        }),
        (Opcode::Add | Opcode::Sub, _) => Err(arity(m, "2 or 3", ops.len())),

        (Opcode::Clr, [dst]) => Ok(Instruction::Clr { dst: parse_register(m, dst)? }),
        (Opcode::Clr, _) => Err(arity(m, "1", ops.len())),
    }
}

fn arity(opcode: &'static str, expected: &str, found: usize) -> DecodeError {
    DecodeError::operand(opcode, format!("expected {} operands, found {}", expected, found))
}

/// Parse an immediate (`#n`) or register operand.
pub fn parse_operand(opcode: &'static str, tok: &str) -> Result<Operand, DecodeError> {
    if let Some(lit) = tok.strip_prefix('#') {
        return parse_immediate(lit)
            .map(Operand::Imm)
            .ok_or_else(|| DecodeError::operand(opcode, format!("bad immediate `{}`", tok)));
    }
    parse_register(opcode, tok).map(Operand::Reg)
}

fn parse_register(opcode: &'static str, tok: &str) -> Result<Reg, DecodeError> {
    if tok.starts_with('#') {
        return Err(DecodeError::operand(opcode, format!("`{}` must be a register", tok)));
    }
    tok.parse::<Reg>()
        .map_err(|_| DecodeError::operand(opcode, format!("`{}` is not a register", tok)))
}

/// Decimal or `0x` hex literal with an optional sign.
pub fn parse_immediate(lit: &str) -> Option<i64> {
    let (neg, body) = match lit.as_bytes().first() {
        Some(b'-') => (true, &lit[1..]),
        Some(b'+') => (false, &lit[1..]),
        _ => (false, lit),
    };
    let mag = if let Some(hex) = body.strip_prefix("0X").or_else(|| body.strip_prefix("0x")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        i64::from_str_radix(hex, 16).ok()?
    } else {
        if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        body.parse::<i64>().ok()?
    };
    Some(if neg { -mag } else { mag })
}
