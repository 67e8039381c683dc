//! RV -> C translation
//!
//! Emits a single C translation unit that mirrors the interpreter for
//! one program: little-endian memory helpers, the register file and
//! PC, and a `switch (pc)` with one case per instruction. Each case
//! reproduces the instruction's semantics (including the RV32M
//! division corner cases) and sets `pc` to the follow-on value;
//! leaving the program falls through to `default` and returns.
//!
//! Every case carries the originating source line as a comment.

use itertools::Itertools;

use crate::instr::{Format, Instruction, Opcode};
use crate::memory::MEM_SIZE;
use crate::program::Program;

const PRELUDE: &str = r#"#include <stdint.h>

static uint32_t load8(const uint8_t *mem, uint32_t addr) {
    return mem[addr];
}

static uint32_t load16(const uint8_t *mem, uint32_t addr) {
    return (uint32_t)mem[addr] | ((uint32_t)mem[addr + 1] << 8);
}

static uint32_t load32(const uint8_t *mem, uint32_t addr) {
    return (uint32_t)mem[addr] | ((uint32_t)mem[addr + 1] << 8)
        | ((uint32_t)mem[addr + 2] << 16) | ((uint32_t)mem[addr + 3] << 24);
}

static void store8(uint8_t *mem, uint32_t addr, uint32_t value) {
    mem[addr] = (uint8_t)(value & 0xff);
}

static void store16(uint8_t *mem, uint32_t addr, uint32_t value) {
    store8(mem, addr, value);
    store8(mem, addr + 1, value >> 8);
}

static void store32(uint8_t *mem, uint32_t addr, uint32_t value) {
    store16(mem, addr, value);
    store16(mem, addr + 2, value >> 16);
}
"#;

/// Emit the whole translation unit
pub fn translate(program: &Program) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(PRELUDE.trim_end().to_owned());
    lines.push(String::new());
    lines.push(format!("#define MEM_SIZE {MEM_SIZE}"));
    lines.push(String::new());
    lines.push("int main(void) {".to_owned());
    lines.push("    static uint8_t mem[MEM_SIZE];".to_owned());
    lines.push("    int32_t x[32] = {0};".to_owned());
    lines.push("    uint32_t pc = 0;".to_owned());
    lines.push("    x[2] = MEM_SIZE - 4;".to_owned());
    lines.push("    for (;;) {".to_owned());
    lines.push("        x[0] = 0;".to_owned());
    lines.push("        switch (pc) {".to_owned());
    for (index, inst) in program.instructions.iter().enumerate() {
        let pc = 4 * index as u32;
        let source = program.source_for(inst);
        let comment = if source.is_empty() {
            String::new()
        } else {
            format!(" // {source}")
        };
        lines.push(format!("        case {pc}: {{{comment}"));
        for stmt in case_body(inst, pc) {
            lines.push(format!("            {stmt}"));
        }
        lines.push("            break;".to_owned());
        lines.push("        }".to_owned());
    }
    lines.push("        default:".to_owned());
    lines.push("            return 0;".to_owned());
    lines.push("        }".to_owned());
    lines.push("    }".to_owned());
    lines.push("}".to_owned());
    lines.iter().join("\n") + "\n"
}

/// Statements for one case, ending with the pc update
fn case_body(inst: &Instruction, pc: u32) -> Vec<String> {
    let next = pc.wrapping_add(4);
    let set_next = format!("pc = {next}u;");
    match inst.op.format() {
        Format::RegImm | Format::RegReg => {
            let mut stmts = Vec::new();
            if inst.rd != 0 {
                stmts.push(format!("x[{}] = {};", inst.rd, alu_expr(inst)));
            }
            stmts.push(set_next);
            stmts
        }
        Format::UpperImm => {
            let shifted = (inst.imm as u32).wrapping_shl(12);
            let value = match inst.op {
                Opcode::Lui => shifted,
                _ => pc.wrapping_add(shifted),
            };
            let mut stmts = Vec::new();
            if inst.rd != 0 {
                stmts.push(format!("x[{}] = (int32_t)0x{value:08x}u;", inst.rd));
            }
            stmts.push(set_next);
            stmts
        }
        Format::Load => {
            let addr = address_expr(inst);
            let mut stmts = Vec::new();
            if inst.rd != 0 {
                let value = match inst.op {
                    Opcode::Lb => format!("(int32_t)(int8_t)load8(mem, {addr})"),
                    Opcode::Lbu => format!("(int32_t)load8(mem, {addr})"),
                    Opcode::Lh => format!("(int32_t)(int16_t)load16(mem, {addr})"),
                    Opcode::Lhu => format!("(int32_t)load16(mem, {addr})"),
                    _ => format!("(int32_t)load32(mem, {addr})"),
                };
                stmts.push(format!("x[{}] = {value};", inst.rd));
            }
            stmts.push(set_next);
            stmts
        }
        Format::Store => {
            let addr = address_expr(inst);
            let helper = match inst.op {
                Opcode::Sb => "store8",
                Opcode::Sh => "store16",
                _ => "store32",
            };
            vec![
                format!("{helper}(mem, {addr}, (uint32_t)x[{}]);", inst.rs2),
                set_next,
            ]
        }
        Format::Branch => {
            let cond = branch_cond(inst);
            vec![format!("pc = ({cond}) ? {}u : {next}u;", inst.target_pc)]
        }
        Format::Jal => {
            let mut stmts = Vec::new();
            if inst.rd != 0 {
                stmts.push(format!("x[{}] = {next};", inst.rd));
            }
            stmts.push(format!("pc = {}u;", inst.target_pc));
            stmts
        }
        Format::Jalr => {
            // The target must be read before the link write clobbers a
            // shared register
            let mut stmts = vec![format!(
                "uint32_t target = (uint32_t)(x[{}] + {}) & ~1u;",
                inst.rs1,
                signed(inst.imm)
            )];
            if inst.rd != 0 {
                stmts.push(format!("x[{}] = {next};", inst.rd));
            }
            stmts.push("pc = target;".to_owned());
            stmts
        }
        Format::Ecall => {
            vec!["// ecall: no architectural effect".to_owned(), set_next]
        }
    }
}

/// Parenthesize negative immediates so they read cleanly inside
/// larger expressions
fn signed(imm: i32) -> String {
    if imm < 0 {
        format!("({imm})")
    } else {
        imm.to_string()
    }
}

fn address_expr(inst: &Instruction) -> String {
    format!("(uint32_t)(x[{}] + {})", inst.rs1, signed(inst.imm))
}

fn alu_expr(inst: &Instruction) -> String {
    let a = format!("x[{}]", inst.rs1);
    let ua = format!("(uint32_t)x[{}]", inst.rs1);
    // Second operand: a register for R-type, the immediate otherwise
    let (b, ub, shift) = if inst.op.format() == Format::RegReg {
        (
            format!("x[{}]", inst.rs2),
            format!("(uint32_t)x[{}]", inst.rs2),
            format!("(x[{}] & 31)", inst.rs2),
        )
    } else {
        (
            signed(inst.imm),
            format!("(uint32_t){}", signed(inst.imm)),
            (inst.imm & 31).to_string(),
        )
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
        Opcode::Mulh => format!("(int32_t)(((int64_t){a} * (int64_t){b}) >> 32)"),
        Opcode::Mulhsu => format!("(int32_t)(((int64_t){a} * (int64_t){ub}) >> 32)"),
        Opcode::Mulhu => format!("(int32_t)(((uint64_t){ua} * (uint64_t){ub}) >> 32)"),
        Opcode::Div => format!(
            "({b} == 0) ? -1 : (({a} == INT32_MIN && {b} == -1) ? INT32_MIN : ({a} / {b}))"
        ),
        Opcode::Divu => format!("({ub} == 0u) ? -1 : (int32_t)({ua} / {ub})"),
        Opcode::Rem => {
            format!("({b} == 0) ? {a} : (({a} == INT32_MIN && {b} == -1) ? 0 : ({a} % {b}))")
        }
        Opcode::Remu => format!("({ub} == 0u) ? {a} : (int32_t)({ua} % {ub})"),
        _ => unreachable!("not an ALU opcode"),
    }
}

fn branch_cond(inst: &Instruction) -> String {
    let a = format!("x[{}]", inst.rs1);
    let b = format!("x[{}]", inst.rs2);
    let ua = format!("(uint32_t)x[{}]", inst.rs1);
    let ub = format!("(uint32_t)x[{}]", inst.rs2);
    match inst.op {
        Opcode::Beq => format!("{a} == {b}"),
        Opcode::Bne => format!("{a} != {b}"),
        Opcode::Blt => format!("{a} < {b}"),
        Opcode::Bge => format!("{a} >= {b}"),
        Opcode::Bltu => format!("{ua} < {ub}"),
        Opcode::Bgeu => format!("{ua} >= {ub}"),
        _ => unreachable!("not a branch opcode"),
    }
}
