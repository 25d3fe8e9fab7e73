//! Top-level simulator: owns the `Cpu` behind the one lock the concurrency
//! model grants it.
//!
//! Device background threads (timer, keyboard, net async poll, interrupt
//! dispatch) never take this lock; they only ever touch the shared
//! `InterruptLine`. The lock is held for exactly one `Cpu::step` at a time,
//! so a device thread raising an interrupt is never blocked behind a guest
//! instruction for longer than that one step.

use std::sync::{Arc, Mutex};

use crate::core::Cpu;

/// Owns the [`Cpu`] and drives its fetch/decode/execute/trap loop.
pub struct Simulator {
    cpu: Arc<Mutex<Cpu>>,
}

impl Simulator {
    /// Wraps `cpu` for the run loop.
    #[must_use]
    pub fn new(cpu: Cpu) -> Self {
        Self {
            cpu: Arc::new(Mutex::new(cpu)),
        }
    }

    /// Runs until the machine halts, returning the exit code `halt` set (or
    /// `0` if the machine triple-faulted without one).
    pub fn run(&self) -> u32 {
        loop {
            let mut cpu = self.cpu.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if cpu.halted {
                return cpu.take_exit().unwrap_or(0);
            }
            cpu.step();
        }
    }

    /// Clones the handle the CLI uses to print final register state after
    /// `run` returns.
    #[must_use]
    pub fn handle(&self) -> Arc<Mutex<Cpu>> {
        Arc::clone(&self.cpu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::opcodes::names::HALT;
    use crate::soc::System;

    fn test_cpu() -> Cpu {
        let path = std::env::temp_dir().join(format!(
            "rvt-simulator-test-{}-{}",
            std::process::id(),
            counter()
        ));
        let (system, line) = System::assemble(0x1000, path.to_str().unwrap()).unwrap();
        Cpu::new(system, line, false)
    }

    fn counter() -> u32 {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        COUNTER.fetch_add(1, Ordering::SeqCst)
    }

    #[test]
    fn run_stops_at_halt_and_returns_exit_code() {
        let mut cpu = test_cpu();
        cpu.bus.bus.write_u32(0, u32::from(HALT));
        let sim = Simulator::new(cpu);
        assert_eq!(sim.run(), 0);
    }
}
