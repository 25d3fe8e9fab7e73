//! End-to-end CPU scenarios: small programs run to completion through
//! `Cpu::step`, checking the same invariants as the spec's testable
//! properties (PC advance, carry flag, trap/rfe round trip, page faults).

use crate::common::harness::TestContext;
use rvsim_core::common::constants::{REG_BASEPTR, REG_CARRY, VEC_DIVISION, VEC_ILLEGAL};
use rvsim_core::common::data::AccessMask;
use rvsim_core::isa::opcodes::names::{ADD, ADDI, DIV, HALT, JMP, JMPEQI, JMPLT, LOADWI, RFE, SAVEW, STRAPI};

#[test]
fn add_sets_carry_on_overflow_past_u32_max() {
    let mut ctx = TestContext::new(0x1000);
    ctx.cpu.regs.write_internal(0, u32::MAX).unwrap();
    ctx.cpu.regs.write_internal(1, 1).unwrap();
    ctx.inst(0, ADD, 0, 1, 2);
    ctx.cpu.step();
    assert_eq!(ctx.cpu.regs.read_internal(2).unwrap(), 0);
    assert_eq!(ctx.cpu.regs.read_internal(REG_CARRY).unwrap(), 1);
}

#[test]
fn loop_counts_down_to_zero_via_conditional_jump() {
    let mut ctx = TestContext::new(0x1000);
    // r0 = 3; loop: r0 -= 1; if r0 == 0 jump to halt; else loop again.
    ctx.cpu.regs.write_internal(0, 3).unwrap();
    ctx.inst(0, ADDI, 0, (-1i32) as u32, 0);
    ctx.inst(16, JMPEQI, 0, 0, 48);
    ctx.inst(32, JMP, 0, 0, 0);
    ctx.inst(48, HALT, 0, 0, 0);

    ctx.run_until_halt(64);
    assert!(ctx.cpu.halted);
    assert_eq!(ctx.cpu.regs.read_internal(0).unwrap(), 0);
}

#[test]
fn save_word_out_of_bounds_traps_illegal_instruction() {
    let mut ctx = TestContext::new(0x1000);
    ctx.cpu.regs.write_internal(0, 0xAB).unwrap();
    ctx.inst(0, SAVEW, 0, u32::MAX - 1, 0);
    ctx.cpu.step();
    assert_eq!(ctx.cpu.regs.pc(), VEC_ILLEGAL);
}

#[test]
fn trap_entry_then_rfe_restores_pc_and_shadow_state() {
    let mut ctx = TestContext::new(0x1000);
    ctx.cpu.bus.bus.write_u32(0, 0xFF); // unknown opcode
    let pc_before = ctx.cpu.regs.pc();
    ctx.cpu.step();
    assert_eq!(ctx.cpu.regs.pc(), VEC_ILLEGAL);
    assert_eq!(ctx.cpu.regs.ret(), pc_before + 16);

    ctx.inst(VEC_ILLEGAL, RFE, 0, 0, 0);
    ctx.cpu.step();
    assert_eq!(ctx.cpu.regs.pc(), pc_before + 16);
    assert_eq!(ctx.cpu.fc, 0);
}

#[test]
fn loadwi_add_and_halt_leaves_the_summed_register_and_clear_carry() {
    let mut ctx = TestContext::new(0x1000);
    ctx.inst(0, LOADWI, 0, 7, 0);
    ctx.inst(16, LOADWI, 1, 5, 0);
    ctx.inst(32, ADD, 0, 1, 2);
    ctx.inst(48, HALT, 0, 0, 0);

    ctx.run_until_halt(8);
    assert!(ctx.cpu.halted);
    assert_eq!(ctx.cpu.regs.read_internal(2).unwrap(), 12);
    assert_eq!(ctx.cpu.regs.read_internal(REG_CARRY).unwrap(), 0);
}

#[test]
fn signed_compare_treats_high_bit_set_values_as_negative() {
    let mut ctx = TestContext::new(0x1000);
    ctx.inst(0, LOADWI, 0, u32::MAX, 0); // r0 = -1 signed
    ctx.inst(16, LOADWI, 1, 1, 0);
    ctx.inst(32, JMPLT, 0, 1, 64); // -1 < 1, jump taken
    ctx.inst(48, HALT, 0, 0, 0); // skipped if jump taken
    ctx.inst(64, HALT, 0, 0, 0);

    ctx.cpu.step();
    ctx.cpu.step();
    ctx.cpu.step();
    assert_eq!(ctx.cpu.regs.pc(), 64);
}

#[test]
fn division_by_zero_routes_through_a_handler_installed_with_strapi() {
    let mut ctx = TestContext::new(0x1000);
    // strapi 2, end — installs `jmp end` at the division-by-zero vector.
    ctx.inst(0, STRAPI, 2, 64, 0);
    ctx.inst(16, LOADWI, 0, 1, 0);
    ctx.inst(32, LOADWI, 1, 0, 0);
    let div_addr = 48;
    ctx.inst(div_addr, DIV, 0, 1, 2);
    ctx.inst(64, HALT, 0, 0, 0); // "end"

    ctx.run_until_halt(8);
    assert!(ctx.cpu.halted);
    assert_eq!(ctx.cpu.regs.ret(), div_addr);
    assert_eq!(ctx.cpu.fc, 1);
    assert_eq!(ctx.cpu.bus.bus.read_u32(VEC_DIVISION), u32::from(JMP));
}

#[test]
fn page_fault_on_empty_table_does_not_set_accessed_bit() {
    let mut ctx = TestContext::new(0x1_0000);
    ctx.cpu.regs.write_internal(REG_BASEPTR, 0x2000).unwrap();
    let result = ctx
        .cpu
        .mmu
        .translate(&mut ctx.cpu.bus.bus, 0x2000, false, 0x5000, AccessMask::READ);
    assert!(result.is_err());
}
