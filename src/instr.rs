//! Decoded instruction records
//!
//! An [`Instruction`] is a flat record: an [`Opcode`] tag plus the
//! register, immediate and target fields the tag uses. Unused fields
//! are zero. Instructions are built by the assembler and never change
//! afterwards; the stepper and the view emitters match exhaustively
//! over the tag.

use std::fmt;

/// Opcode tags for the supported RV32IM subset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Integer register-immediate
    Addi,
    Andi,
    Ori,
    Xori,
    Slti,
    Sltiu,
    Slli,
    Srli,
    Srai,
    // Integer register-register
    Add,
    Sub,
    And,
    Or,
    Xor,
    Slt,
    Sltu,
    Sll,
    Srl,
    Sra,
    // M extension
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
    // Loads
    Lb,
    Lbu,
    Lh,
    Lhu,
    Lw,
    // Stores
    Sb,
    Sh,
    Sw,
    // Control transfer
    Jal,
    Jalr,
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
    // Upper immediate
    Lui,
    Auipc,
    // Environment
    Ecall,
}

/// Operand shape of an opcode, used by the parser and the printers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `op rd, rs1, rs2`
    RegReg,
    /// `op rd, rs1, imm`
    RegImm,
    /// `op rd, imm(rs1)`
    Load,
    /// `op rs2, imm(rs1)`
    Store,
    /// `op rs1, rs2, target`
    Branch,
    /// `jal rd, target`
    Jal,
    /// `jalr rd, imm(rs1)`
    Jalr,
    /// `op rd, imm` (LUI/AUIPC)
    UpperImm,
    /// no operands
    Ecall,
}

impl Opcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Addi => "addi",
            Opcode::Andi => "andi",
            Opcode::Ori => "ori",
            Opcode::Xori => "xori",
            Opcode::Slti => "slti",
            Opcode::Sltiu => "sltiu",
            Opcode::Slli => "slli",
            Opcode::Srli => "srli",
            Opcode::Srai => "srai",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Slt => "slt",
            Opcode::Sltu => "sltu",
            Opcode::Sll => "sll",
            Opcode::Srl => "srl",
            Opcode::Sra => "sra",
            Opcode::Mul => "mul",
            Opcode::Mulh => "mulh",
            Opcode::Mulhsu => "mulhsu",
            Opcode::Mulhu => "mulhu",
            Opcode::Div => "div",
            Opcode::Divu => "divu",
            Opcode::Rem => "rem",
            Opcode::Remu => "remu",
            Opcode::Lb => "lb",
            Opcode::Lbu => "lbu",
            Opcode::Lh => "lh",
            Opcode::Lhu => "lhu",
            Opcode::Lw => "lw",
            Opcode::Sb => "sb",
            Opcode::Sh => "sh",
            Opcode::Sw => "sw",
            Opcode::Jal => "jal",
            Opcode::Jalr => "jalr",
            Opcode::Beq => "beq",
            Opcode::Bne => "bne",
            Opcode::Blt => "blt",
            Opcode::Bge => "bge",
            Opcode::Bltu => "bltu",
            Opcode::Bgeu => "bgeu",
            Opcode::Lui => "lui",
            Opcode::Auipc => "auipc",
            Opcode::Ecall => "ecall",
        }
    }

    pub fn from_mnemonic(mnemonic: &str) -> Option<Opcode> {
        let op = match mnemonic {
            "addi" => Opcode::Addi,
            "andi" => Opcode::Andi,
            "ori" => Opcode::Ori,
            "xori" => Opcode::Xori,
            "slti" => Opcode::Slti,
            "sltiu" => Opcode::Sltiu,
            "slli" => Opcode::Slli,
            "srli" => Opcode::Srli,
            "srai" => Opcode::Srai,
            "add" => Opcode::Add,
            "sub" => Opcode::Sub,
            "and" => Opcode::And,
            "or" => Opcode::Or,
            "xor" => Opcode::Xor,
            "slt" => Opcode::Slt,
            "sltu" => Opcode::Sltu,
            "sll" => Opcode::Sll,
            "srl" => Opcode::Srl,
            "sra" => Opcode::Sra,
            "mul" => Opcode::Mul,
            "mulh" => Opcode::Mulh,
            "mulhsu" => Opcode::Mulhsu,
            "mulhu" => Opcode::Mulhu,
            "div" => Opcode::Div,
            "divu" => Opcode::Divu,
            "rem" => Opcode::Rem,
            "remu" => Opcode::Remu,
            "lb" => Opcode::Lb,
            "lbu" => Opcode::Lbu,
            "lh" => Opcode::Lh,
            "lhu" => Opcode::Lhu,
            "lw" => Opcode::Lw,
            "sb" => Opcode::Sb,
            "sh" => Opcode::Sh,
            "sw" => Opcode::Sw,
            "jal" => Opcode::Jal,
            "jalr" => Opcode::Jalr,
            "beq" => Opcode::Beq,
            "bne" => Opcode::Bne,
            "blt" => Opcode::Blt,
            "bge" => Opcode::Bge,
            "bltu" => Opcode::Bltu,
            "bgeu" => Opcode::Bgeu,
            "lui" => Opcode::Lui,
            "auipc" => Opcode::Auipc,
            "ecall" => Opcode::Ecall,
            _ => return None,
        };
        Some(op)
    }

    pub fn format(self) -> Format {
        match self {
            Opcode::Addi
            | Opcode::Andi
            | Opcode::Ori
            | Opcode::Xori
            | Opcode::Slti
            | Opcode::Sltiu
            | Opcode::Slli
            | Opcode::Srli
            | Opcode::Srai => Format::RegImm,
            Opcode::Add
            | Opcode::Sub
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::Slt
            | Opcode::Sltu
            | Opcode::Sll
            | Opcode::Srl
            | Opcode::Sra
            | Opcode::Mul
            | Opcode::Mulh
            | Opcode::Mulhsu
            | Opcode::Mulhu
            | Opcode::Div
            | Opcode::Divu
            | Opcode::Rem
            | Opcode::Remu => Format::RegReg,
            Opcode::Lb | Opcode::Lbu | Opcode::Lh | Opcode::Lhu | Opcode::Lw => Format::Load,
            Opcode::Sb | Opcode::Sh | Opcode::Sw => Format::Store,
            Opcode::Beq
            | Opcode::Bne
            | Opcode::Blt
            | Opcode::Bge
            | Opcode::Bltu
            | Opcode::Bgeu => Format::Branch,
            Opcode::Jal => Format::Jal,
            Opcode::Jalr => Format::Jalr,
            Opcode::Lui | Opcode::Auipc => Format::UpperImm,
            Opcode::Ecall => Format::Ecall,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// One decoded instruction
///
/// `target_pc` is the absolute byte address of a branch or jump
/// destination, already resolved by the assembler. `src_line` is the
/// 0-based index of the source line the instruction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Opcode,
    pub rd: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub imm: i32,
    pub target_pc: u32,
    pub src_line: usize,
}

impl Instruction {
    /// A new instruction with every operand field zeroed
    pub fn new(op: Opcode, src_line: usize) -> Self {
        Self {
            op,
            rd: 0,
            rs1: 0,
            rs2: 0,
            imm: 0,
            target_pc: 0,
            src_line,
        }
    }
}

/// ABI names for x0..x31, in register-index order
pub const ABI_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

/// Parse a register token: `xN` for N in 0..31, or an ABI alias
/// (including `fp` for x8).
pub fn parse_register(token: &str) -> Option<u8> {
    if let Some(rest) = token.strip_prefix('x') {
        // Reject forms like "x01a" but accept "x0".."x31"
        if let Ok(n) = rest.parse::<u32>() {
            if n < 32 {
                return Some(n as u8);
            }
        }
        return None;
    }
    if token == "fp" {
        return Some(8);
    }
    ABI_NAMES.iter().position(|&name| name == token).map(|i| i as u8)
}
