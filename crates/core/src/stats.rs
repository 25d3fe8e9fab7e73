//! Simulation statistics collection and reporting.
//!
//! This architecture is single-issue, so cycles and retired instructions
//! track together; the only other counter worth keeping is how often traps
//! fired, which is the main signal for "is this guest program well-behaved."

use std::time::Instant;

/// Simulation statistics, printed once the machine halts or triple-faults.
#[derive(Clone)]
pub struct SimStats {
    start_time: Instant,
    /// Instructions committed (retired).
    pub instructions_retired: u64,
    /// Traps taken (faults and interrupts combined).
    pub traps_taken: u64,
    /// Cycles spent with `STATUS.USER` set.
    pub cycles_user: u64,
    /// Cycles spent with `STATUS.USER` clear (kernel mode).
    pub cycles_kernel: u64,
}

impl Default for SimStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            instructions_retired: 0,
            traps_taken: 0,
            cycles_user: 0,
            cycles_kernel: 0,
        }
    }
}

impl SimStats {
    /// Records one retired instruction in the given privilege mode.
    pub fn record_instruction(&mut self, user_mode: bool) {
        self.instructions_retired += 1;
        if user_mode {
            self.cycles_user += 1;
        } else {
            self.cycles_kernel += 1;
        }
    }

    /// Records one trap (fault or interrupt) taken.
    pub fn record_trap(&mut self) {
        self.traps_taken += 1;
    }

    /// Prints a summary to stdout.
    pub fn print(&self) {
        let seconds = self.start_time.elapsed().as_secs_f64();
        let mips = (self.instructions_retired as f64 / seconds.max(1e-9)) / 1_000_000.0;
        println!("==========================================================");
        println!("SIMULATION STATISTICS");
        println!("==========================================================");
        println!("host_seconds             {seconds:.4} s");
        println!("sim_insts                {}", self.instructions_retired);
        println!("sim_mips                 {mips:.2}");
        println!("traps_taken              {}", self.traps_taken);
        println!(
            "cycles.user              {} ({:.2}%)",
            self.cycles_user,
            100.0 * self.cycles_user as f64 / self.instructions_retired.max(1) as f64
        );
        println!(
            "cycles.kernel            {} ({:.2}%)",
            self.cycles_kernel,
            100.0 * self.cycles_kernel as f64 / self.instructions_retired.max(1) as f64
        );
        println!("==========================================================");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_instructions_and_traps() {
        let mut stats = SimStats::default();
        stats.record_instruction(true);
        stats.record_instruction(false);
        stats.record_trap();
        assert_eq!(stats.instructions_retired, 2);
        assert_eq!(stats.cycles_user, 1);
        assert_eq!(stats.cycles_kernel, 1);
        assert_eq!(stats.traps_taken, 1);
    }
}
