//! C-like explanation
//!
//! A best-effort, human-readable rendering of the program built from a
//! single forward pass. Two running maps do the work: registers whose
//! values are provably constant at this point in the listing, and
//! registers known to hold a value loaded from a constant address.
//! The pass is not flow-sensitive; a branch invalidates nothing. The
//! output is cosmetic, not semantic.

use std::collections::HashMap;

use itertools::Itertools;

use crate::cpu::{alu_imm, alu_reg};
use crate::instr::{Format, Instruction, Opcode};
use crate::program::Program;

#[derive(Default)]
struct Tracker {
    reg_const: HashMap<u8, i32>,
    reg_ptr_from: HashMap<u8, u32>,
}

impl Tracker {
    /// x0 is always a known zero
    fn known(&self, reg: u8) -> Option<i32> {
        if reg == 0 {
            Some(0)
        } else {
            self.reg_const.get(&reg).copied()
        }
    }

    fn set_const(&mut self, reg: u8, value: i32) {
        if reg != 0 {
            self.reg_const.insert(reg, value);
            self.reg_ptr_from.remove(&reg);
        }
    }

    fn set_loaded_from(&mut self, reg: u8, addr: u32) {
        if reg != 0 {
            self.reg_const.remove(&reg);
            self.reg_ptr_from.insert(reg, addr);
        }
    }

    fn invalidate(&mut self, reg: u8) {
        self.reg_const.remove(&reg);
        self.reg_ptr_from.remove(&reg);
    }
}

pub fn explain(program: &Program) -> String {
    let mut tracker = Tracker::default();
    let mut out: Vec<String> = Vec::new();
    for (index, inst) in program.instructions.iter().enumerate() {
        let pc = 4 * index as u32;
        for label in program.labels_at(pc) {
            out.push(format!("{label}:"));
        }
        out.push(format!("    {}", statement(inst, pc, program, &mut tracker)));
    }
    for label in program.labels_at(program.end_pc()) {
        out.push(format!("{label}:"));
    }
    out.iter().join("\n")
}

fn statement(inst: &Instruction, pc: u32, program: &Program, tracker: &mut Tracker) -> String {
    let next = pc.wrapping_add(4);
    match inst.op.format() {
        Format::RegImm | Format::RegReg => alu_statement(inst, tracker),
        Format::UpperImm => {
            let shifted = (inst.imm as u32).wrapping_shl(12);
            let value = match inst.op {
                Opcode::Lui => shifted as i32,
                _ => pc.wrapping_add(shifted) as i32,
            };
            if inst.rd == 0 {
                return "// no effect".to_owned();
            }
            tracker.set_const(inst.rd, value);
            format!("x{} = 0x{:08x};", inst.rd, value as u32)
        }
        Format::Load => load_statement(inst, program, tracker),
        Format::Store => store_statement(inst, program, tracker),
        Format::Branch => {
            let target = target_name(inst.target_pc, program);
            if inst.op == Opcode::Beq && inst.rs1 == inst.rs2 {
                return format!("goto {target};");
            }
            let a = reg_name(inst.rs1);
            let b = reg_name(inst.rs2);
            let cond = match inst.op {
                Opcode::Beq => format!("{a} == {b}"),
                Opcode::Bne => format!("{a} != {b}"),
                Opcode::Blt => format!("{a} < {b}"),
                Opcode::Bge => format!("{a} >= {b}"),
                Opcode::Bltu => format!("(uint32_t){a} < (uint32_t){b}"),
                _ => format!("(uint32_t){a} >= (uint32_t){b}"),
            };
            format!("if ({cond}) goto {target};")
        }
        Format::Jal => {
            let target = target_name(inst.target_pc, program);
            if inst.rd == 0 {
                return format!("goto {target};");
            }
            tracker.set_const(inst.rd, next as i32);
            format!("x{} = {next}; goto {target};", inst.rd)
        }
        Format::Jalr => {
            if inst.rd == 0 && inst.rs1 == 1 && inst.imm == 0 {
                return "return;".to_owned();
            }
            // Read the base before the link write clobbers a shared
            // register
            let base = tracker.known(inst.rs1);
            let link = if inst.rd == 0 {
                String::new()
            } else {
                tracker.set_const(inst.rd, next as i32);
                format!("x{} = {next}; ", inst.rd)
            };
            if let Some(base) = base {
                let target = (base.wrapping_add(inst.imm)) as u32 & !1;
                format!("{link}goto {};", target_name(target, program))
            } else {
                format!("{link}pc = x{} + {}; // indirect jump", inst.rs1, inst.imm)
            }
        }
        Format::Ecall => "// ecall".to_owned(),
    }
}

fn alu_statement(inst: &Instruction, tracker: &mut Tracker) -> String {
    if inst.rd == 0 {
        return "// no effect".to_owned();
    }
    let folded = if inst.op.format() == Format::RegReg {
        match (tracker.known(inst.rs1), tracker.known(inst.rs2)) {
            (Some(a), Some(b)) => Some(alu_reg(inst.op, a, b)),
            _ => None,
        }
    } else {
        tracker.known(inst.rs1).map(|a| alu_imm(inst.op, a, inst.imm))
    };

    // Load-immediate and register-copy shapes read better plain
    let text = if inst.op == Opcode::Addi && inst.rs1 == 0 {
        format!("x{} = {};", inst.rd, inst.imm)
    } else if inst.op == Opcode::Addi && inst.imm == 0 {
        format!("x{} = x{};", inst.rd, inst.rs1)
    } else {
        format!("x{} = {};", inst.rd, alu_text(inst))
    };

    match folded {
        Some(value) => {
            tracker.set_const(inst.rd, value);
            if inst.op == Opcode::Addi && inst.rs1 == 0 {
                // The constant is already the whole statement
                text
            } else {
                format!("{text} // = {value}")
            }
        }
        None => {
            tracker.invalidate(inst.rd);
            text
        }
    }
}

fn alu_text(inst: &Instruction) -> String {
    let a = reg_name(inst.rs1);
    let ua = format!("(uint32_t){a}");
    let (b, ub, shift) = if inst.op.format() == Format::RegReg {
        let b = reg_name(inst.rs2);
        (b.clone(), format!("(uint32_t){b}"), format!("({b} & 31)"))
    } else {
        let imm = if inst.imm < 0 {
            format!("({})", inst.imm)
        } else {
            inst.imm.to_string()
        };
        (imm.clone(), format!("(uint32_t){imm}"), (inst.imm & 31).to_string())
    };
    match inst.op {
        Opcode::Addi | Opcode::Add => format!("{a} + {b}"),
        Opcode::Sub => format!("{a} - {b}"),
        Opcode::Andi | Opcode::And => format!("{a} & {b}"),
        Opcode::Ori | Opcode::Or => format!("{a} | {b}"),
        Opcode::Xori | Opcode::Xor => format!("{a} ^ {b}"),
        Opcode::Slti | Opcode::Slt => format!("({a} < {b}) ? 1 : 0"),
        Opcode::Sltiu | Opcode::Sltu => format!("({ua} < {ub}) ? 1 : 0"),
        Opcode::Slli | Opcode::Sll => format!("{a} << {shift}"),
        Opcode::Srli | Opcode::Srl => format!("(int32_t)({ua} >> {shift})"),
        Opcode::Srai | Opcode::Sra => format!("{a} >> {shift}"),
        Opcode::Mul => format!("{a} * {b}"),
        Opcode::Mulh => format!("mulh({a}, {b})"),
        Opcode::Mulhsu => format!("mulhsu({a}, {b})"),
        Opcode::Mulhu => format!("mulhu({a}, {b})"),
        Opcode::Div => format!("{a} / {b}"),
        Opcode::Divu => format!("(int32_t)({ua} / {ub})"),
        Opcode::Rem => format!("{a} % {b}"),
        Opcode::Remu => format!("(int32_t)({ua} % {ub})"),
        _ => unreachable!("not an ALU opcode"),
    }
}

fn load_statement(inst: &Instruction, program: &Program, tracker: &mut Tracker) -> String {
    let ctype = value_ctype(inst.op);
    if inst.rd == 0 {
        return "// no effect".to_owned();
    }
    if let Some(base) = tracker.known(inst.rs1) {
        let addr = base.wrapping_add(inst.imm) as u32;
        if inst.op == Opcode::Lw {
            tracker.set_loaded_from(inst.rd, addr);
        } else {
            tracker.invalidate(inst.rd);
        }
        format!("x{} = *({ctype}*){};", inst.rd, address_name(addr, program))
    } else {
        tracker.invalidate(inst.rd);
        format!("x{} = *({ctype}*)({});", inst.rd, base_plus_offset(inst))
    }
}

fn store_statement(inst: &Instruction, program: &Program, tracker: &mut Tracker) -> String {
    let ctype = value_ctype(inst.op);
    let value_comment = if let Some(value) = tracker.known(inst.rs2) {
        format!(" // = {value}")
    } else if let Some(&src) = tracker.reg_ptr_from.get(&inst.rs2) {
        // Readback of a value previously loaded from a known address
        format!(" // value of {}", address_name(src, program))
    } else {
        String::new()
    };
    if let Some(base) = tracker.known(inst.rs1) {
        let addr = base.wrapping_add(inst.imm) as u32;
        format!(
            "*({ctype}*){} = x{};{value_comment}",
            address_name(addr, program),
            inst.rs2
        )
    } else {
        format!(
            "*({ctype}*)({}) = x{};{value_comment}",
            base_plus_offset(inst),
            inst.rs2
        )
    }
}

fn value_ctype(op: Opcode) -> &'static str {
    match op {
        Opcode::Lb => "int8_t",
        Opcode::Lbu => "uint8_t",
        Opcode::Lh => "int16_t",
        Opcode::Lhu => "uint16_t",
        Opcode::Sb => "uint8_t",
        Opcode::Sh => "uint16_t",
        _ => "int32_t",
    }
}

fn reg_name(reg: u8) -> String {
    format!("x{reg}")
}

fn base_plus_offset(inst: &Instruction) -> String {
    if inst.imm == 0 {
        reg_name(inst.rs1)
    } else if inst.imm < 0 {
        format!("x{} - {}", inst.rs1, -i64::from(inst.imm))
    } else {
        format!("x{} + {}", inst.rs1, inst.imm)
    }
}

/// Symbol names are preferred over raw addresses
fn address_name(addr: u32, program: &Program) -> String {
    match program.name_for_address(addr) {
        Some(name) => name.to_owned(),
        None => format!("0x{addr:08x}"),
    }
}

fn target_name(pc: u32, program: &Program) -> String {
    address_name(pc, program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;

    fn explained(source: &str) -> String {
        explain(&assemble(source).unwrap())
    }

    #[test]
    fn load_immediate_reads_as_assignment() {
        let text = explained("addi x5, x0, 42\nmv x6, x5");
        assert!(text.contains("x5 = 42;"));
        // The copy is folded because x5 is a known constant
        assert!(text.contains("x6 = x5; // = 42"));
    }

    #[test]
    fn constants_propagate_through_arithmetic() {
        let text = explained("addi x1, x0, 5\naddi x2, x1, 7\nadd x3, x1, x2");
        assert!(text.contains("x2 = x1 + 7; // = 12"));
        assert!(text.contains("x3 = x1 + x2; // = 17"));
    }

    #[test]
    fn unknown_operands_render_plain_expressions() {
        let text = explained("lw x1, 0(x5)\nadd x2, x1, x1\nsltu x3, x1, x2");
        assert!(text.contains("x2 = x1 + x1;"));
        assert!(!text.contains("x2 = x1 + x1; //"));
        assert!(text.contains("x3 = ((uint32_t)x1 < (uint32_t)x2) ? 1 : 0;"));
    }

    #[test]
    fn lui_and_auipc_are_constants() {
        let text = explained("lui x5, 0x12345\nauipc x6, 0");
        assert!(text.contains("x5 = 0x12345000;"));
        assert!(text.contains("x6 = 0x00000004;"));
    }

    #[test]
    fn self_branch_is_a_goto() {
        let text = explained("spin: beq x3, x3, spin\nbeq x1, x2, spin");
        assert!(text.contains("    goto spin;"));
        assert!(text.contains("if (x1 == x2) goto spin;"));
    }

    #[test]
    fn unsigned_branches_cast_their_operands() {
        let text = explained("top: bltu x1, x2, top\nbgeu x3, x4, top");
        assert!(text.contains("if ((uint32_t)x1 < (uint32_t)x2) goto top;"));
        assert!(text.contains("if ((uint32_t)x3 >= (uint32_t)x4) goto top;"));
    }

    #[test]
    fn symbol_names_are_preferred_for_known_addresses() {
        let text = explained("#sym counter = 0x40\nli x1, 0x40\nlw x2, 0(x1)\nsw x2, 0(x1)");
        assert!(text.contains("x2 = *(int32_t*)counter;"));
        assert!(text.contains("*(int32_t*)counter = x2;"));
    }

    #[test]
    fn unknown_bases_render_as_pointer_arithmetic() {
        let text = explained("lw x1, 0(x9)\nlb x2, 4(x9)\nsh x3, -2(x9)");
        assert!(text.contains("x1 = *(int32_t*)(x9);"));
        assert!(text.contains("x2 = *(int8_t*)(x9 + 4);"));
        assert!(text.contains("*(uint16_t*)(x9 - 2) = x3;"));
    }

    #[test]
    fn known_stored_values_are_annotated() {
        let text = explained("li x1, 20\nli x2, 7\nsw x2, 0(x1)");
        assert!(text.contains("*(int32_t*)0x00000014 = x2; // = 7"));
    }

    #[test]
    fn stored_values_remember_where_they_were_loaded_from() {
        let text = explained("#sym counter = 0x40\nli x1, 0x40\nlw x2, 0(x1)\nsw x2, 8(x1)");
        assert!(text.contains("*(int32_t*)0x00000048 = x2; // value of counter"));
    }

    #[test]
    fn loads_invalidate_previous_constants() {
        let text = explained("li x1, 8\nli x2, 0x40\nlw x1, 0(x2)\nadd x3, x1, x1");
        // x1 is no longer 8 after the load, so the add cannot fold
        assert!(text.contains("x3 = x1 + x1;"));
        assert!(!text.contains("x3 = x1 + x1; //"));
    }

    #[test]
    fn calls_and_returns_read_as_c() {
        let text = explained("call sub\nsub: ret");
        assert!(text.contains("x1 = 4; goto sub;"));
        assert!(text.contains("return;"));
    }

    #[test]
    fn jalr_with_known_base_becomes_goto() {
        let text = explained("li x5, 8\njalr x1, 0(x5)\nnop");
        assert!(text.contains("x1 = 8; goto 0x00000008;"));
    }

    #[test]
    fn labels_are_emitted_inline() {
        let text = explained("entry: addi x1, x0, 1\nend:");
        assert!(text.starts_with("entry:\n"));
        assert!(text.ends_with("end:"));
    }
}
