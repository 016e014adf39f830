//! Working register file.
//!
//! The teaching machine exposes six working registers `W0`–`W5`, each holding
//! a signed integer. The register set is a closed enum, so an unknown name is
//! rejected when an instruction is decoded rather than at execution time.
//!
//! | Register | Index |
//! |----------|-------|
//! | W0       | 0     |
//! | ...      | ...   |
//! | W5       | 5     |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::REGISTER_COUNT;

/// Working register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Reg {
    W0,
    W1,
    W2,
    W3,
    W4,
    W5,
}

impl Reg {
    /// All registers in index order.
    pub const ALL: [Reg; REGISTER_COUNT] = [Reg::W0, Reg::W1, Reg::W2, Reg::W3, Reg::W4, Reg::W5];

    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<Reg> {
        Self::ALL.get(i).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Reg::W0 => "W0",
            Reg::W1 => "W1",
            Reg::W2 => "W2",
            Reg::W3 => "W3",
            Reg::W4 => "W4",
            Reg::W5 => "W5",
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Reg {
    type Err = ();

    /// Parse a register name. Case-insensitive (`w3` and `W3` both work).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s.strip_prefix('W').or_else(|| s.strip_prefix('w')).ok_or(())?;
        if digits.len() != 1 {
            return Err(());
        }
        let idx = digits.parse::<usize>().map_err(|_| ())?;
        Reg::from_index(idx).ok_or(())
    }
}

/// Fixed-size register file. All registers start at zero.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterFile {
    values: [i64; REGISTER_COUNT],
}

impl RegisterFile {
    pub fn new() -> Self {
        RegisterFile { values: [0; REGISTER_COUNT] }
    }

    #[inline(always)]
    pub fn get(&self, r: Reg) -> i64 {
        self.values[r.index()]
    }

    #[inline(always)]
    pub fn set(&mut self, r: Reg, v: i64) {
        self.values[r.index()] = v;
    }

    /// Zero every register.
    pub fn reset(&mut self) {
        self.values = [0; REGISTER_COUNT];
    }

    /// Raw values in index order.
    pub fn values(&self) -> [i64; REGISTER_COUNT] {
        self.values
    }

    /// Iterate `(register, value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Reg, i64)> + '_ {
        Reg::ALL.iter().map(move |&r| (r, self.values[r.index()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_register_names() {
        assert_eq!("W0".parse::<Reg>(), Ok(Reg::W0));
        assert_eq!("w5".parse::<Reg>(), Ok(Reg::W5));
        assert!("W6".parse::<Reg>().is_err());
        assert!("W10".parse::<Reg>().is_err());
        assert!("R1".parse::<Reg>().is_err());
        assert!("W".parse::<Reg>().is_err());
    }

    #[test]
    fn test_register_file_starts_zeroed() {
        let rf = RegisterFile::new();
        assert!(rf.iter().all(|(_, v)| v == 0));
        assert_eq!(rf.iter().count(), REGISTER_COUNT);
    }

    #[test]
    fn test_set_get_reset() {
        let mut rf = RegisterFile::new();
        rf.set(Reg::W3, -42);
        assert_eq!(rf.get(Reg::W3), -42);
        assert_eq!(rf.get(Reg::W2), 0);
        rf.reset();
        assert_eq!(rf.get(Reg::W3), 0);
    }
}
