//! Instruction decoding: opcode table coverage and malformed-operand
//! rejection, exercised through the public `Instruction::decode` entry point
//! rather than constructing instructions by hand.

use rvsim_core::common::constants::REG_RSVD;
use rvsim_core::common::error::Trap;
use rvsim_core::isa::opcodes::names::{ADD, HALT, NOP};
use rvsim_core::isa::Instruction;

#[test]
fn every_canonical_opcode_decodes_with_zero_operands() {
    for opcode in 0u32..=0x46 {
        let result = Instruction::decode(opcode, 0, 0, 0);
        assert!(result.is_ok(), "opcode {opcode:#04x} failed to decode with zero operands");
    }
}

#[test]
fn opcode_past_the_table_is_illegal() {
    let result = Instruction::decode(0x47, 0, 0, 0);
    assert_eq!(result, Err(Trap::IllegalInstruction));
}

#[test]
fn rsvd_register_operand_is_illegal_in_any_slot() {
    assert_eq!(
        Instruction::decode(u32::from(ADD), u32::from(REG_RSVD), 1, 2),
        Err(Trap::IllegalInstruction)
    );
    assert_eq!(
        Instruction::decode(u32::from(ADD), 1, u32::from(REG_RSVD), 2),
        Err(Trap::IllegalInstruction)
    );
}

#[test]
fn nop_and_halt_carry_no_register_operands() {
    let nop = Instruction::decode(u32::from(NOP), 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF).unwrap();
    assert_eq!(nop.opcode, NOP);
    let halt = Instruction::decode(u32::from(HALT), 0, 0, 0).unwrap();
    assert_eq!(halt.opcode, HALT);
}
