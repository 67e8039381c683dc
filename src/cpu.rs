//! CPU stepper
//!
//! The [`Cpu`] owns the register file and the memory, and executes one
//! instruction per call to [`Cpu::step`] against a borrowed
//! [`Program`]. Each step yields a [`StepResult`] carrying the decoded
//! instruction, the ordered list of architectural [`Effect`]s the
//! instruction had, and the [`Trap`] that stopped execution, if any.
//!
//! Effect ordering within a step is deterministic: register and memory
//! effects appear in the order the instruction logically performs
//! them, followed by exactly one PC effect. A trapping step emits no
//! PC effect, and the trap checks run before state is mutated, so the
//! machine remains inspectable exactly as it was at the trap point.
//!
//! Register x0 is hard-wired to zero: writes to it are discarded and
//! recorded nowhere. Writes that do not change a register's value are
//! performed but produce no effect record; memory stores, in contrast,
//! always produce one.

use std::fmt;

use itertools::Itertools;
use thiserror::Error;

use crate::instr::{Format, Instruction, Opcode};
use crate::memory::{Memory, MemoryError, StoreResult};
use crate::program::Program;
use crate::utils::{interpret_i32_as_unsigned, interpret_u32_as_signed, mask, sign_extend};

/// Cap on the iteration budget of [`Cpu::step_many`]
pub const MAX_STEPS_PER_REQUEST: u32 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapCode {
    IllegalInstruction,
    BadAlignment,
    OobMemory,
    PcOob,
    StepLimit,
}

/// A non-recoverable execution fault. The simulator stays inspectable:
/// registers, memory and PC keep the values they had when the trap was
/// raised.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Trap {
    pub code: TrapCode,
    pub message: String,
}

impl Trap {
    fn new(code: TrapCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<MemoryError> for Trap {
    fn from(error: MemoryError) -> Self {
        let code = match error {
            MemoryError::Misaligned { .. } => TrapCode::BadAlignment,
            MemoryError::OutOfBounds { .. } => TrapCode::OobMemory,
        };
        Trap::new(code, error.to_string())
    }
}

/// One observed architectural state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Register write that changed a register other than x0
    Reg { reg: u8, before: i32, after: i32 },
    /// Memory store, recorded even when the bytes did not change
    Mem {
        addr: u32,
        size: u8,
        before: Vec<u8>,
        after: Vec<u8>,
    },
    /// The PC update closing a successful step
    Pc { before: u32, after: u32 },
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).join(" ")
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Reg { reg, before, after } => write!(f, "x{reg}: {before} -> {after}"),
            Effect::Mem {
                addr,
                before,
                after,
                ..
            } => write!(
                f,
                "mem[0x{addr:08x}]: {} -> {}",
                hex_bytes(before),
                hex_bytes(after)
            ),
            Effect::Pc { before, after } => write!(f, "pc: 0x{before:08x} -> 0x{after:08x}"),
        }
    }
}

/// The outcome of one step (or of a `step_many` budget)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    /// The instruction that executed, if one was fetched
    pub inst: Option<Instruction>,
    pub effects: Vec<Effect>,
    /// True when the caller should stop stepping
    pub halted: bool,
    pub trap: Option<Trap>,
}

impl StepResult {
    fn trapped(inst: Option<Instruction>, effects: Vec<Effect>, trap: Trap) -> Self {
        Self {
            inst,
            effects,
            halted: true,
            trap: Some(trap),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cpu {
    pc: u32,
    regs: [i32; 32],
    pub memory: Memory,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        let mut cpu = Self {
            pc: 0,
            regs: [0; 32],
            memory: Memory::default(),
        };
        cpu.reset();
        cpu
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn reg(&self, n: u8) -> i32 {
        self.regs[n as usize]
    }

    pub fn regs(&self) -> &[i32; 32] {
        &self.regs
    }

    /// Zero the registers, point the stack pointer at the top of
    /// memory and rewind the PC. Memory contents are left alone.
    pub fn reset(&mut self) {
        self.pc = 0;
        self.regs = [0; 32];
        self.regs[2] = interpret_u32_as_signed(self.memory.size() - 4);
    }

    /// Execute the instruction at the current PC
    pub fn step(&mut self, program: &Program) -> StepResult {
        let result = self.step_inner(program);
        // x0 is architectural zero, whatever just happened
        self.regs[0] = 0;
        result
    }

    fn step_inner(&mut self, program: &Program) -> StepResult {
        let pc = self.pc;
        if pc % 4 != 0 {
            return StepResult::trapped(
                None,
                Vec::new(),
                Trap::new(
                    TrapCode::BadAlignment,
                    format!("misaligned pc 0x{pc:08x}"),
                ),
            );
        }
        let Some(inst) = program.instructions.get((pc / 4) as usize).copied() else {
            return StepResult::trapped(
                None,
                Vec::new(),
                Trap::new(
                    TrapCode::PcOob,
                    format!("pc 0x{pc:08x} is outside the program"),
                ),
            );
        };

        let mut effects = Vec::new();
        match self.execute(&inst, pc, &mut effects) {
            Ok(next_pc) => {
                if next_pc % 4 != 0 {
                    return StepResult::trapped(
                        Some(inst),
                        effects,
                        Trap::new(
                            TrapCode::BadAlignment,
                            format!("jump to misaligned address 0x{next_pc:08x}"),
                        ),
                    );
                }
                effects.push(Effect::Pc {
                    before: pc,
                    after: next_pc,
                });
                self.pc = next_pc;
                StepResult {
                    inst: Some(inst),
                    effects,
                    halted: false,
                    trap: None,
                }
            }
            Err(trap) => StepResult::trapped(Some(inst), effects, trap),
        }
    }

    /// Run up to `count` steps (clamped to [`MAX_STEPS_PER_REQUEST`]),
    /// stopping early on halt or trap. Exhausting the budget yields a
    /// synthesized halted result with a step-limit trap.
    pub fn step_many(&mut self, program: &Program, count: u32) -> StepResult {
        let budget = count.clamp(1, MAX_STEPS_PER_REQUEST);
        for _ in 0..budget {
            let result = self.step(program);
            if result.halted {
                return result;
            }
        }
        StepResult::trapped(
            None,
            Vec::new(),
            Trap::new(
                TrapCode::StepLimit,
                format!("step limit of {budget} reached"),
            ),
        )
    }

    /// Execute one decoded instruction and return the next PC. Effects
    /// are appended in the order they logically occur; the caller adds
    /// the closing PC effect.
    fn execute(
        &mut self,
        inst: &Instruction,
        pc: u32,
        effects: &mut Vec<Effect>,
    ) -> Result<u32, Trap> {
        let next = pc.wrapping_add(4);
        let src1 = self.reg(inst.rs1);
        let src2 = self.reg(inst.rs2);
        match inst.op.format() {
            Format::RegImm => {
                self.write_reg(effects, inst.rd, alu_imm(inst.op, src1, inst.imm));
                Ok(next)
            }
            Format::RegReg => {
                self.write_reg(effects, inst.rd, alu_reg(inst.op, src1, src2));
                Ok(next)
            }
            Format::UpperImm => {
                let shifted = inst.imm.wrapping_shl(12);
                let value = match inst.op {
                    Opcode::Lui => shifted,
                    _ => interpret_u32_as_signed(
                        pc.wrapping_add(interpret_i32_as_unsigned(shifted)),
                    ),
                };
                self.write_reg(effects, inst.rd, value);
                Ok(next)
            }
            Format::Load => {
                let addr = effective_address(src1, inst.imm);
                let value = self.load(inst.op, addr)?;
                self.write_reg(effects, inst.rd, value);
                Ok(next)
            }
            Format::Store => {
                let addr = effective_address(src1, inst.imm);
                let result = self.store(inst.op, addr, src2)?;
                effects.push(Effect::Mem {
                    addr,
                    size: result.after.len() as u8,
                    before: result.before,
                    after: result.after,
                });
                Ok(next)
            }
            Format::Branch => {
                if branch_taken(inst.op, src1, src2) {
                    Ok(inst.target_pc)
                } else {
                    Ok(next)
                }
            }
            Format::Jal => {
                self.write_reg(effects, inst.rd, interpret_u32_as_signed(next));
                Ok(inst.target_pc)
            }
            Format::Jalr => {
                // Target comes from rs1 as it was before the link
                // write, so rd == rs1 still jumps to the old value
                let target = effective_address(src1, inst.imm) & !1;
                self.write_reg(effects, inst.rd, interpret_u32_as_signed(next));
                Ok(target)
            }
            Format::Ecall => Ok(next),
        }
    }

    /// Guarded register write: x0 is discarded, unchanged values are
    /// written but not recorded
    fn write_reg(&mut self, effects: &mut Vec<Effect>, reg: u8, value: i32) {
        if reg == 0 {
            return;
        }
        let before = self.regs[reg as usize];
        self.regs[reg as usize] = value;
        if before != value {
            effects.push(Effect::Reg {
                reg,
                before,
                after: value,
            });
        }
    }

    fn load(&self, op: Opcode, addr: u32) -> Result<i32, Trap> {
        let value = match op {
            Opcode::Lb => interpret_u32_as_signed(sign_extend(self.memory.load_byte(addr)?, 7)),
            Opcode::Lbu => i32::from(self.memory.load_byte(addr)?),
            Opcode::Lh => interpret_u32_as_signed(sign_extend(self.memory.load_half(addr)?, 15)),
            Opcode::Lhu => i32::from(self.memory.load_half(addr)?),
            Opcode::Lw => self.memory.load_word(addr)?,
            _ => unreachable!("not a load opcode"),
        };
        Ok(value)
    }

    fn store(&mut self, op: Opcode, addr: u32, value: i32) -> Result<StoreResult, Trap> {
        let result = match op {
            Opcode::Sb => self.memory.store_byte(addr, value as u8)?,
            Opcode::Sh => self.memory.store_half(addr, value as u16)?,
            Opcode::Sw => self.memory.store_word(addr, value)?,
            _ => unreachable!("not a store opcode"),
        };
        Ok(result)
    }
}

fn effective_address(base: i32, offset: i32) -> u32 {
    interpret_i32_as_unsigned(base).wrapping_add(interpret_i32_as_unsigned(offset))
}

fn shamt(value: i32) -> u32 {
    interpret_i32_as_unsigned(value) & mask::<u32>(5)
}

/// Register-immediate ALU semantics
pub(crate) fn alu_imm(op: Opcode, src: i32, imm: i32) -> i32 {
    match op {
        Opcode::Addi => src.wrapping_add(imm),
        Opcode::Andi => src & imm,
        Opcode::Ori => src | imm,
        Opcode::Xori => src ^ imm,
        Opcode::Slti => i32::from(src < imm),
        Opcode::Sltiu => {
            i32::from(interpret_i32_as_unsigned(src) < interpret_i32_as_unsigned(imm))
        }
        Opcode::Slli => src.wrapping_shl(shamt(imm)),
        Opcode::Srli => interpret_u32_as_signed(interpret_i32_as_unsigned(src) >> shamt(imm)),
        Opcode::Srai => src >> shamt(imm),
        _ => unreachable!("not a register-immediate opcode"),
    }
}

/// Register-register ALU semantics, including the M extension
pub(crate) fn alu_reg(op: Opcode, src1: i32, src2: i32) -> i32 {
    match op {
        Opcode::Add => src1.wrapping_add(src2),
        Opcode::Sub => src1.wrapping_sub(src2),
        Opcode::And => src1 & src2,
        Opcode::Or => src1 | src2,
        Opcode::Xor => src1 ^ src2,
        Opcode::Slt => i32::from(src1 < src2),
        Opcode::Sltu => {
            i32::from(interpret_i32_as_unsigned(src1) < interpret_i32_as_unsigned(src2))
        }
        Opcode::Sll => src1.wrapping_shl(shamt(src2)),
        Opcode::Srl => interpret_u32_as_signed(interpret_i32_as_unsigned(src1) >> shamt(src2)),
        Opcode::Sra => src1 >> shamt(src2),
        Opcode::Mul => src1.wrapping_mul(src2),
        Opcode::Mulh => ((i64::from(src1).wrapping_mul(i64::from(src2))) >> 32) as i32,
        Opcode::Mulhsu => {
            ((i64::from(src1).wrapping_mul(i64::from(interpret_i32_as_unsigned(src2)))) >> 32)
                as i32
        }
        Opcode::Mulhu => {
            let product = u64::from(interpret_i32_as_unsigned(src1))
                .wrapping_mul(u64::from(interpret_i32_as_unsigned(src2)));
            interpret_u32_as_signed((product >> 32) as u32)
        }
        Opcode::Div => {
            if src2 == 0 {
                -1
            } else if src1 == i32::MIN && src2 == -1 {
                i32::MIN
            } else {
                src1 / src2
            }
        }
        Opcode::Divu => {
            let (a, b) = (interpret_i32_as_unsigned(src1), interpret_i32_as_unsigned(src2));
            if b == 0 {
                -1
            } else {
                interpret_u32_as_signed(a / b)
            }
        }
        Opcode::Rem => {
            if src2 == 0 {
                src1
            } else if src1 == i32::MIN && src2 == -1 {
                0
            } else {
                src1 % src2
            }
        }
        Opcode::Remu => {
            let (a, b) = (interpret_i32_as_unsigned(src1), interpret_i32_as_unsigned(src2));
            if b == 0 {
                src1
            } else {
                interpret_u32_as_signed(a % b)
            }
        }
        _ => unreachable!("not a register-register opcode"),
    }
}

/// Branch predicate on current register values
pub(crate) fn branch_taken(op: Opcode, src1: i32, src2: i32) -> bool {
    match op {
        Opcode::Beq => src1 == src2,
        Opcode::Bne => src1 != src2,
        Opcode::Blt => src1 < src2,
        Opcode::Bge => src1 >= src2,
        Opcode::Bltu => interpret_i32_as_unsigned(src1) < interpret_i32_as_unsigned(src2),
        Opcode::Bgeu => interpret_i32_as_unsigned(src1) >= interpret_i32_as_unsigned(src2),
        _ => unreachable!("not a branch opcode"),
    }
}
