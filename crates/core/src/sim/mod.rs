//! Simulation entry points: the top-level `Simulator` and the flat binary
//! image loader.

/// Loads a flat binary image into RAM at address 0.
pub mod loader;

/// Top-level `Simulator`: owns the `Cpu` and drives its run loop.
pub mod simulator;
