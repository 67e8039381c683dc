//! The parsed-program bundle
//!
//! A [`Program`] is the immutable result of a successful assembly:
//! the instruction sequence (instruction `i` lives at PC `4*i`), the
//! original source lines kept verbatim for diagnostics and generated-C
//! comments, and the label and symbol tables.

use std::collections::HashMap;

use crate::instr::Instruction;

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub source_lines: Vec<String>,
    /// Label name -> instruction PC. A label may bind to the
    /// end-of-program PC (one past the last instruction).
    pub labels: HashMap<String, u32>,
    /// `#sym` name -> absolute byte address
    pub symbols: HashMap<String, u32>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// PC one past the last instruction
    pub fn end_pc(&self) -> u32 {
        4 * self.instructions.len() as u32
    }

    /// Labels bound to the given PC, sorted for deterministic output
    pub fn labels_at(&self, pc: u32) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .labels
            .iter()
            .filter(|(_, &label_pc)| label_pc == pc)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Preferred name for an address: the first label bound to it, then
    /// the first symbol, else None. Used when rendering branch targets
    /// and memory addresses.
    pub fn name_for_address(&self, addr: u32) -> Option<&str> {
        self.labels_at(addr).first().copied().or_else(|| {
            let mut names: Vec<&str> = self
                .symbols
                .iter()
                .filter(|(_, &value)| value == addr)
                .map(|(name, _)| name.as_str())
                .collect();
            names.sort_unstable();
            names.first().copied()
        })
    }

    /// Source text an instruction came from, trimmed
    pub fn source_for(&self, inst: &Instruction) -> &str {
        self.source_lines
            .get(inst.src_line)
            .map(|line| line.trim())
            .unwrap_or("")
    }
}
