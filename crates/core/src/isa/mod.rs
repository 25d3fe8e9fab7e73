//! Instruction set: the canonical opcode table and the fetched-instruction
//! representation `execute` dispatches on.

/// Opcode constants and the static per-opcode operand-shape table.
pub mod opcodes;

/// Fetched, bounds-checked instruction.
pub mod instruction;

pub use instruction::Instruction;
pub use opcodes::{names, ArgKind, OpcodeInfo};
