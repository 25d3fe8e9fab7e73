//! Integration test entry point.
//!
//! Complements the `#[cfg(test)]` unit tests living next to each module with
//! whole-program scenarios: assemble a tiny image, run it through
//! `Simulator`, and assert on the final architectural state.

/// Shared test infrastructure: building a `Cpu` and running short programs.
pub mod common;

/// End-to-end scenarios, one file per subsystem under test.
pub mod unit;
