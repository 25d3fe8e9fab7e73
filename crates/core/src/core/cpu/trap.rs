//! Trap entry and return, and the fault-count (FC) escalation ladder.
//!
//! Grounded in the privilege/shadow-register model of `common::reg` plus
//! `original_source/compyter/cpu.py`'s `trap`/`ret` pair, reworked onto this
//! architecture's explicit `FC` counter instead of the original's single
//! re-entrancy flag (`REG_TRAP`), so a third nested fault can be
//! distinguished (triple fault → halt) from a second one (forced onto the
//! double-fault vector).

use crate::common::constants::VEC_DOUBLE_FAULT;

use super::Cpu;

impl Cpu {
    /// Enters a trap at `requested_vector`, rewinding `PC` to `return_pc`
    /// (the instruction to retry, or the next instruction if the trap
    /// kind doesn't retry).
    ///
    /// Escalates per the FC ladder: the second nested trap is forced onto
    /// the double-fault vector regardless of what it actually was; the
    /// third halts the machine outright.
    pub(super) fn enter_trap(&mut self, requested_vector: u32, return_pc: u32) {
        self.fc += 1;
        if self.fc >= 3 {
            tracing::error!(pc = return_pc, "triple fault, halting");
            self.halted = true;
            return;
        }
        let vector = if self.fc == 2 {
            tracing::warn!(requested_vector, "double fault, forcing vector");
            VEC_DOUBLE_FAULT
        } else {
            requested_vector
        };
        self.regs.shift_shadows_on_trap_entry();
        self.regs.set_return(return_pc);
        self.regs.set_pc(vector);
        self.mmu.invalidate();
    }

    /// Returns from the current trap: shifts the shadow registers back,
    /// decrements `FC`, and resumes at `RETURN`.
    pub(super) fn return_from_exception(&mut self) {
        self.regs.shift_shadows_on_rfe();
        if self.fc > 0 {
            self.fc -= 1;
        }
        self.regs.set_pc(self.regs.ret());
    }
}

#[cfg(test)]
mod tests {
    use crate::common::constants::{VEC_DOUBLE_FAULT, VEC_ILLEGAL, VEC_PAGE_FAULT};
    use crate::soc::System;

    fn test_cpu() -> Cpu {
        use super::*;
        let (system, line) = System::assemble(0x1000, &storage_path()).unwrap();
        Cpu::new(system, line, false)
    }

    fn storage_path() -> String {
        std::env::temp_dir()
            .join(format!("rvt-trap-test-{}-{}", std::process::id(), line_counter()))
            .to_string_lossy()
            .into_owned()
    }

    fn line_counter() -> u32 {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        COUNTER.fetch_add(1, Ordering::SeqCst)
    }

    use super::Cpu;

    #[test]
    fn first_trap_goes_to_requested_vector() {
        let mut cpu = test_cpu();
        cpu.enter_trap(VEC_ILLEGAL, 0x40);
        assert_eq!(cpu.regs.pc(), VEC_ILLEGAL);
        assert_eq!(cpu.regs.ret(), 0x40);
        assert_eq!(cpu.fc, 1);
    }

    #[test]
    fn second_nested_trap_forced_to_double_fault_vector() {
        let mut cpu = test_cpu();
        cpu.enter_trap(VEC_ILLEGAL, 0x40);
        cpu.enter_trap(VEC_PAGE_FAULT, 0x80);
        assert_eq!(cpu.regs.pc(), VEC_DOUBLE_FAULT);
        assert_eq!(cpu.fc, 2);
    }

    #[test]
    fn third_nested_trap_halts() {
        let mut cpu = test_cpu();
        cpu.enter_trap(VEC_ILLEGAL, 0x40);
        cpu.enter_trap(VEC_PAGE_FAULT, 0x80);
        cpu.enter_trap(VEC_PAGE_FAULT, 0xC0);
        assert!(cpu.halted);
        assert_eq!(cpu.fc, 3);
    }

    #[test]
    fn rfe_decrements_fc_and_restores_pc() {
        let mut cpu = test_cpu();
        cpu.enter_trap(VEC_ILLEGAL, 0x40);
        cpu.return_from_exception();
        assert_eq!(cpu.regs.pc(), 0x40);
        assert_eq!(cpu.fc, 0);
    }

    #[test]
    fn double_fault_emits_a_warn_event() {
        use std::sync::{Arc, Mutex};
        use tracing_subscriber::fmt::MakeWriter;

        #[derive(Clone)]
        struct BufWriter(Arc<Mutex<Vec<u8>>>);
        impl std::io::Write for BufWriter {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        impl<'a> MakeWriter<'a> for BufWriter {
            type Writer = Self;
            fn make_writer(&'a self) -> Self::Writer {
                self.clone()
            }
        }

        let buf = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::fmt()
            .with_writer(BufWriter(Arc::clone(&buf)))
            .with_max_level(tracing::Level::WARN)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut cpu = test_cpu();
            cpu.enter_trap(VEC_ILLEGAL, 0x40);
            cpu.enter_trap(VEC_PAGE_FAULT, 0x80);
        });

        let output = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        assert!(output.contains("double fault"));
    }
}
