//! 32-bit fixed-width instruction set simulator.
//!
//! This crate implements a single-core emulator for a small RISC-style
//! architecture with 16-byte instructions, a two-level page-table MMU, a
//! shadow-register privilege/trap model, and a fixed set of MMIO devices:
//! 1. **Core:** [`core::Cpu`] — registers, the MMU, and the fetch/decode/
//!    execute/trap loop.
//! 2. **ISA:** decoding and per-opcode execution for all 71 opcodes.
//! 3. **SoC:** the bus, trap-vector aperture, and MMIO devices (interrupt
//!    controller, printer, keyboard, timer, RTC, block storage, net
//!    adapter).
//! 4. **Simulation:** [`sim::simulator::Simulator`], the flat binary loader,
//!    and configuration.

/// Common types and constants (addresses, registers, traps, access types).
pub mod common;
/// Simulator configuration (defaults, layered TOML/JSON overrides).
pub mod config;
/// CPU core: registers, MMU, page table entries, fetch/decode/execute/trap.
pub mod core;
/// Instruction set: opcode table and instruction decoding.
pub mod isa;
/// Simulation: `Simulator` and the flat binary image loader.
pub mod sim;
/// System-on-chip: bus, MMIO devices, interrupt controller, system builder.
pub mod soc;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from a
/// config file.
pub use crate::config::Config;
/// Main CPU type; owns registers, MMU, bus, and stats.
pub use crate::core::Cpu;
/// Top-level simulator; owns the CPU and drives its run loop.
pub use crate::sim::simulator::Simulator;
/// Assembled system (bus, trap aperture, MMIO devices); construct with
/// `System::assemble`.
pub use crate::soc::System;
