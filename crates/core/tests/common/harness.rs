//! Shared test harness: a small in-memory machine for assembling and
//! running programs without touching the filesystem (the storage device
//! still needs a backing file, so each context gets its own temp path).

use rvsim_core::core::Cpu;
use rvsim_core::soc::System;

pub struct TestContext {
    pub cpu: Cpu,
}

impl TestContext {
    pub fn new(ram_bytes: u32) -> Self {
        let path = std::env::temp_dir().join(format!(
            "rvt-integration-test-{}-{}",
            std::process::id(),
            unique()
        ));
        let (system, interrupts) = System::assemble(ram_bytes, path.to_str().unwrap()).unwrap();
        Self {
            cpu: Cpu::new(system, interrupts, false),
        }
    }

    /// Writes one 16-byte instruction at `addr`.
    pub fn inst(&mut self, addr: u32, opcode: u8, op1: u32, op2: u32, op3: u32) {
        self.cpu.bus.bus.write_u32(addr, u32::from(opcode));
        self.cpu.bus.bus.write_u32(addr + 4, op1);
        self.cpu.bus.bus.write_u32(addr + 8, op2);
        self.cpu.bus.bus.write_u32(addr + 12, op3);
    }

    /// Steps until the machine halts or a step budget is exhausted;
    /// returns the number of steps actually taken.
    pub fn run_until_halt(&mut self, max_steps: u32) -> u32 {
        let mut steps = 0;
        while !self.cpu.halted && steps < max_steps {
            self.cpu.step();
            steps += 1;
        }
        steps
    }
}

fn unique() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    COUNTER.fetch_add(1, Ordering::SeqCst)
}
