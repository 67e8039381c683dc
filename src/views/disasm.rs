//! Linear disassembly
//!
//! Walks the program in PC order, emitting one line per label bound to
//! a PC followed by the instruction at that PC, and finally any labels
//! bound to the end of the program. Branch and jump targets are shown
//! by name when a label or symbol resolves to the target address.

use itertools::Itertools;

use crate::instr::{Format, Instruction};
use crate::program::Program;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisasmLine {
    pub pc: u32,
    pub text: String,
    pub is_label: bool,
}

pub fn disassemble(program: &Program) -> Vec<DisasmLine> {
    let mut lines = Vec::new();
    for (index, inst) in program.instructions.iter().enumerate() {
        let pc = 4 * index as u32;
        for label in program.labels_at(pc) {
            lines.push(DisasmLine {
                pc,
                text: format!("{label}:"),
                is_label: true,
            });
        }
        lines.push(DisasmLine {
            pc,
            text: format!("0x{pc:08x}: {}", format_instruction(inst, program)),
            is_label: false,
        });
    }
    let end = program.end_pc();
    for label in program.labels_at(end) {
        lines.push(DisasmLine {
            pc: end,
            text: format!("{label}:"),
            is_label: true,
        });
    }
    lines
}

pub fn render(program: &Program) -> String {
    disassemble(program).iter().map(|line| line.text.as_str()).join("\n")
}

/// `mnemonic operands` text for one instruction. Targets are rendered
/// through the program's label and symbol tables.
pub fn format_instruction(inst: &Instruction, program: &Program) -> String {
    let mnemonic = inst.op.mnemonic();
    match inst.op.format() {
        Format::RegReg => format!("{mnemonic} x{}, x{}, x{}", inst.rd, inst.rs1, inst.rs2),
        Format::RegImm => format!("{mnemonic} x{}, x{}, {}", inst.rd, inst.rs1, inst.imm),
        Format::Load | Format::Jalr => {
            format!("{mnemonic} x{}, {}(x{})", inst.rd, inst.imm, inst.rs1)
        }
        Format::Store => format!("{mnemonic} x{}, {}(x{})", inst.rs2, inst.imm, inst.rs1),
        Format::Branch => format!(
            "{mnemonic} x{}, x{}, {}",
            inst.rs1,
            inst.rs2,
            format_target(inst.target_pc, program)
        ),
        Format::Jal => format!(
            "{mnemonic} x{}, {}",
            inst.rd,
            format_target(inst.target_pc, program)
        ),
        Format::UpperImm => format!("{mnemonic} x{}, 0x{:x}", inst.rd, inst.imm),
        Format::Ecall => mnemonic.to_owned(),
    }
}

fn format_target(pc: u32, program: &Program) -> String {
    match program.name_for_address(pc) {
        Some(name) => name.to_owned(),
        None => format!("0x{pc:08x}"),
    }
}
