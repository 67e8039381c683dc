//! Simulator façade
//!
//! A [`Simulator`] bundles one parsed program with one CPU. Assembling
//! replaces the program only when parsing succeeds, then resets the
//! CPU; memory contents are kept so callers can pre-populate memory
//! before assembling. Stepping and snapshots delegate to the CPU and
//! the view emitters.

use crate::asm::{self, AsmError};
use crate::cpu::{Cpu, StepResult};
use crate::program::Program;
use crate::views::{c_mirror, disasm, explain};

/// A point-in-time view of the machine plus the three program views
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub pc: u32,
    pub regs: [i32; 32],
    pub clike: String,
    pub rv2c: String,
    pub disasm: String,
}

#[derive(Debug, Clone, Default)]
pub struct Simulator {
    program: Program,
    cpu: Cpu,
}

impl Simulator {
    /// A simulator with an empty program; any step traps immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `source` and make it the current program. On success the
    /// CPU is reset (memory is not cleared); on failure the previous
    /// program stays in place untouched.
    pub fn assemble(&mut self, source: &str) -> Result<(), AsmError> {
        let program = asm::assemble(source)?;
        self.program = program;
        self.cpu.reset();
        Ok(())
    }

    /// Reset the CPU only; the program and memory are kept
    pub fn reset(&mut self) {
        self.cpu.reset();
    }

    pub fn step(&mut self) -> StepResult {
        self.cpu.step(&self.program)
    }

    pub fn step_many(&mut self, count: u32) -> StepResult {
        self.cpu.step_many(&self.program, count)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pc: self.cpu.pc(),
            regs: *self.cpu.regs(),
            clike: explain::explain(&self.program),
            rv2c: c_mirror::translate(&self.program),
            disasm: disasm::render(&self.program),
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// Mutable access to the CPU, e.g. for pre-populating memory
    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{Effect, TrapCode, MAX_STEPS_PER_REQUEST};
    use crate::memory::MEM_SIZE;

    /// Assemble and run until a halt, returning the simulator and the
    /// halting result
    fn run_to_halt(source: &str) -> (Simulator, StepResult) {
        let mut sim = Simulator::new();
        sim.assemble(source).unwrap();
        let result = sim.step_many(MAX_STEPS_PER_REQUEST);
        assert!(result.halted);
        (sim, result)
    }

    #[test]
    fn scenario_accumulating_addi() {
        let (sim, result) = run_to_halt("addi x1,x0,5\naddi x2,x0,7\naddi x3,x2,5");
        assert_eq!(result.trap.unwrap().code, TrapCode::PcOob);
        assert_eq!(sim.cpu().reg(1), 5);
        assert_eq!(sim.cpu().reg(2), 7);
        assert_eq!(sim.cpu().reg(3), 12);
    }

    #[test]
    fn scenario_unsigned_branches() {
        let source = "addi x1,x0,-1\naddi x2,x0,1\nbltu x1,x2,not_taken\naddi x3,x0,123\nnot_taken: bgeu x1,x2,done\naddi x3,x0,999\ndone:";
        let (sim, _) = run_to_halt(source);
        assert_eq!(sim.cpu().reg(3), 123);
        assert_eq!(sim.cpu().pc(), 24);
    }

    #[test]
    fn scenario_branch_to_symbol() {
        let source = "#sym far = 16\naddi x1,x0,1\nbne x1,x0,far\naddi x2,x0,9";
        let (sim, result) = run_to_halt(source);
        assert_eq!(result.trap.unwrap().code, TrapCode::PcOob);
        assert_eq!(sim.cpu().pc(), 16);
        // The taken branch lands past the program, so the x2 write
        // never runs and the stack pointer keeps its reset value
        assert_eq!(sim.cpu().reg(2), (MEM_SIZE - 4) as i32);
    }

    #[test]
    fn scenario_store_then_load_word() {
        let source = "addi x1,x0,20\naddi x2,x0,0x11223344\nsw x2,0(x1)\nlw x3,0(x1)";
        let (sim, _) = run_to_halt(source);
        assert_eq!(sim.cpu().reg(3), 0x11223344);
    }

    #[test]
    fn scenario_misaligned_load_traps() {
        let mut sim = Simulator::new();
        sim.assemble("addi x1,x0,1\nlw x2,0(x1)").unwrap();
        assert!(!sim.step().halted);
        let result = sim.step();
        assert!(result.halted);
        assert_eq!(result.trap.unwrap().code, TrapCode::BadAlignment);
    }

    #[test]
    fn scenario_lui_then_pc_oob() {
        let mut sim = Simulator::new();
        sim.assemble("lui x5,0x12345").unwrap();
        let first = sim.step();
        assert!(!first.halted);
        assert_eq!(sim.cpu().reg(5), 0x12345000);
        let second = sim.step();
        assert_eq!(second.trap.unwrap().code, TrapCode::PcOob);
    }

    #[test]
    fn scenario_jalr_masks_low_bit() {
        let source = "addi x1,x0,11\naddi x9,x0,0\njalr x2,1(x1)\naddi x3,x0,0xdead";
        let mut sim = Simulator::new();
        sim.assemble(source).unwrap();
        for _ in 0..3 {
            assert!(!sim.step().halted);
        }
        assert_eq!(sim.cpu().reg(2), 12);
        assert_eq!(sim.cpu().pc(), 12);
        assert!(!sim.step().halted);
        assert_eq!(sim.cpu().reg(3), 0xdead);
    }

    #[test]
    fn register_zero_is_zero_after_every_step() {
        let mut sim = Simulator::new();
        sim.assemble("addi x0,x0,7\njal x0,0\naddi x0,x0,9").unwrap();
        for _ in 0..16 {
            sim.step();
            assert_eq!(sim.cpu().reg(0), 0);
        }
    }

    #[test]
    fn assemble_failure_keeps_the_previous_program() {
        let mut sim = Simulator::new();
        sim.assemble("addi x1,x0,5").unwrap();
        let error = sim.assemble("addi x1,x0,5\nbogus x1").unwrap_err();
        assert_eq!(error.line, 2);
        assert_eq!(sim.program().len(), 1);
        // The old program still runs
        assert!(!sim.step().halted);
        assert_eq!(sim.cpu().reg(1), 5);
    }

    #[test]
    fn assemble_resets_cpu_but_keeps_memory() {
        let mut sim = Simulator::new();
        sim.assemble("addi x1,x0,20\nsw x1,0(x1)").unwrap();
        sim.step_many(3);
        assert_eq!(sim.cpu().memory.load_word(20).unwrap(), 20);
        sim.assemble("lw x3,20(x0)").unwrap();
        assert_eq!(sim.cpu().pc(), 0);
        assert_eq!(sim.cpu().reg(1), 0);
        // Memory written by the previous program is still visible
        sim.step();
        assert_eq!(sim.cpu().reg(3), 20);
    }

    #[test]
    fn pre_populated_memory_survives_assemble() {
        let mut sim = Simulator::new();
        sim.cpu_mut().memory.store_word(0x100, 77).unwrap();
        sim.assemble("lw x1,0x100(x0)").unwrap();
        sim.step();
        assert_eq!(sim.cpu().reg(1), 77);
    }

    #[test]
    fn assembling_the_same_source_twice_is_equivalent() {
        let source = "#sym buf = 0x40\nstart: addi x1,x0,5\nbeq x1,x0,start";
        let first = asm::assemble(source).unwrap();
        let second = asm::assemble(source).unwrap();
        assert_eq!(first.instructions, second.instructions);
        assert_eq!(first.labels, second.labels);
        assert_eq!(first.symbols, second.symbols);
    }

    #[test]
    fn empty_program_traps_immediately() {
        let mut sim = Simulator::new();
        let result = sim.step();
        assert!(result.halted);
        assert_eq!(result.trap.unwrap().code, TrapCode::PcOob);
    }

    #[test]
    fn snapshot_contains_all_three_views() {
        let mut sim = Simulator::new();
        sim.assemble("start: addi x1,x0,5\nbeq x1,x0,start").unwrap();
        sim.step();
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.pc, 4);
        assert_eq!(snapshot.regs[1], 5);
        assert!(snapshot.disasm.contains("0x00000000: addi x1, x0, 5"));
        assert!(snapshot.rv2c.contains("switch (pc) {"));
        assert!(snapshot.clike.contains("x1 = 5;"));
    }

    #[test]
    fn effects_flatten_to_the_wire_shape() {
        // The transport needs reg/mem/pc discriminants with the fields
        // of §6; make sure one step of each kind is observable
        let mut sim = Simulator::new();
        sim.assemble("addi x1,x0,20\nsw x1,0(x1)").unwrap();
        let first = sim.step();
        assert!(matches!(
            first.effects.as_slice(),
            [
                Effect::Reg { reg: 1, before: 0, after: 20 },
                Effect::Pc { before: 0, after: 4 }
            ]
        ));
        let second = sim.step();
        assert!(matches!(
            second.effects.as_slice(),
            [Effect::Mem { addr: 20, size: 4, .. }, Effect::Pc { .. }]
        ));
    }
}
