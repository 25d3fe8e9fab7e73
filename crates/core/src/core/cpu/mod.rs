//! CPU: registers, MMU, bus, and the fetch/decode/execute/trap loop.
//!
//! One [`Cpu`] owns everything the instruction loop touches. The concurrency
//! model gives it a single `std::sync::Mutex` at the `Simulator` layer, held
//! for an entire [`Cpu::step`] call (fetch through trap entry); device
//! background threads never reach into `Cpu` directly; they raise
//! interrupts through [`crate::soc::InterruptLine`], which this struct
//! polls at the top of each step.

/// Instruction fetch and the address-translation helpers used by loads/
/// stores.
mod decode;

/// Per-opcode execution.
mod execute;

/// Trap entry, return, and the FC escalation ladder.
mod trap;

use crate::common::constants::{INSTRUCTION_SIZE, VEC_INTERRUPT};
use crate::common::RegisterFile;
use crate::core::mmu::Mmu;
use crate::soc::{InterruptLine, System};
use crate::stats::SimStats;

use self::execute::Flow;

/// Processor architectural state plus the system it's wired to.
pub struct Cpu {
    /// Architectural registers.
    pub regs: RegisterFile,
    /// Page table walker.
    pub mmu: Mmu,
    /// RAM, trap-vector aperture, and MMIO devices.
    pub bus: System,
    /// Shared flag the interrupt controller's dispatch worker sets.
    pub interrupts: InterruptLine,
    /// Fault count: trap nesting depth, 0-3.
    pub fc: u32,
    /// Set once `halt` executes or the machine triple-faults.
    pub halted: bool,
    /// Exit code for the host process, set by `halt`.
    pub exit_code: Option<u32>,
    /// Print each retired instruction's address and opcode.
    pub trace: bool,
    /// Execution statistics.
    pub stats: SimStats,
}

impl Cpu {
    /// Creates a CPU wired to `system`, with every register zeroed (`PC`=0,
    /// MMU disabled, kernel mode, interrupts disabled — the boot state).
    #[must_use]
    pub fn new(system: System, interrupts: InterruptLine, trace: bool) -> Self {
        Self {
            regs: RegisterFile::new(),
            mmu: Mmu::new(),
            bus: system,
            interrupts,
            fc: 0,
            halted: false,
            exit_code: None,
            trace,
            stats: SimStats::default(),
        }
    }

    /// Runs one fetch/decode/execute cycle, including any interrupt or
    /// trap entry it triggers. Does nothing once `halted` is set.
    pub fn step(&mut self) {
        if self.halted {
            return;
        }

        if self.regs.intr() && self.interrupts.take() {
            let return_pc = self.regs.pc();
            self.enter_trap(VEC_INTERRUPT, return_pc);
            self.stats.record_trap();
            return;
        }

        let pc_before = self.regs.pc();
        let outcome = self.fetch().and_then(|inst| {
            if self.trace {
                println!("{:#010x}: {}", pc_before, inst.info().name);
            }
            #[cfg(feature = "always-trace")]
            tracing::trace!(pc = pc_before, opcode = inst.info().name, "retiring instruction");
            self.execute(inst)
        });

        match outcome {
            Ok(Flow::Next) => {
                self.regs.set_pc(pc_before.wrapping_add(INSTRUCTION_SIZE));
                self.stats.record_instruction(self.regs.user());
            }
            Ok(Flow::Jumped) => {
                self.stats.record_instruction(self.regs.user());
            }
            Err(trap) => {
                let return_pc = if trap.rewinds_pc() {
                    pc_before
                } else {
                    pc_before.wrapping_add(INSTRUCTION_SIZE)
                };
                self.enter_trap(trap.vector(), return_pc);
                self.stats.record_trap();
            }
        }
    }

    /// Takes the host exit code, if the machine has halted.
    pub fn take_exit(&mut self) -> Option<u32> {
        self.exit_code.take()
    }

    /// Dumps all registers to stdout; used when the machine halts or
    /// triple-faults.
    pub fn dump_state(&self) {
        self.regs.dump();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::opcodes::names::{ADD, HALT, JMP, NOP};

    fn test_cpu() -> Cpu {
        let path = std::env::temp_dir().join(format!(
            "rvt-cpu-test-{}-{}",
            std::process::id(),
            counter()
        ));
        let (system, line) = System::assemble(0x1_0000, path.to_str().unwrap()).unwrap();
        Cpu::new(system, line, false)
    }

    fn counter() -> u32 {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        COUNTER.fetch_add(1, Ordering::SeqCst)
    }

    fn write_inst(cpu: &mut Cpu, addr: u32, opcode: u8, op1: u32, op2: u32, op3: u32) {
        cpu.bus.bus.write_u32(addr, u32::from(opcode));
        cpu.bus.bus.write_u32(addr + 4, op1);
        cpu.bus.bus.write_u32(addr + 8, op2);
        cpu.bus.bus.write_u32(addr + 12, op3);
    }

    #[test]
    fn nop_advances_pc_by_one_instruction() {
        let mut cpu = test_cpu();
        write_inst(&mut cpu, 0, NOP, 0, 0, 0);
        cpu.step();
        assert_eq!(cpu.regs.pc(), 16);
        assert_eq!(cpu.stats.instructions_retired, 1);
    }

    #[test]
    fn add_writes_destination_register_and_advances() {
        let mut cpu = test_cpu();
        cpu.regs.write_internal(0, 5).unwrap();
        cpu.regs.write_internal(1, 7).unwrap();
        write_inst(&mut cpu, 0, ADD, 0, 1, 2);
        cpu.step();
        assert_eq!(cpu.regs.read_internal(2).unwrap(), 12);
        assert_eq!(cpu.regs.pc(), 16);
    }

    #[test]
    fn jmp_sets_pc_directly_without_advancing() {
        let mut cpu = test_cpu();
        write_inst(&mut cpu, 0, JMP, 0x100, 0, 0);
        cpu.step();
        assert_eq!(cpu.regs.pc(), 0x100);
    }

    #[test]
    fn illegal_opcode_traps_to_illegal_vector() {
        let mut cpu = test_cpu();
        cpu.bus.bus.write_u32(0, 0xFF);
        cpu.step();
        assert_eq!(cpu.regs.pc(), crate::common::constants::VEC_ILLEGAL);
        assert_eq!(cpu.regs.ret(), 16);
    }

    #[test]
    fn halt_sets_exit_code_and_stops_stepping() {
        let mut cpu = test_cpu();
        write_inst(&mut cpu, 0, HALT, 0, 0, 0);
        cpu.step();
        assert_eq!(cpu.take_exit(), Some(0));
        assert!(cpu.halted);
        let pc_after_halt = cpu.regs.pc();
        cpu.step();
        assert_eq!(cpu.regs.pc(), pc_after_halt);
    }
}
