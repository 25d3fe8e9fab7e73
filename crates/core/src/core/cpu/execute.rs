//! Instruction execution: one function per opcode family, dispatched from
//! [`Cpu::step`] by the opcode byte.
//!
//! Arithmetic, logic, load/store, and branch semantics are grounded in
//! `original_source/compyter/cpu.py`'s per-opcode methods. Two deliberate
//! departures from that source, both decided in the design notes:
//! immediate-operand forms (`addi`, `loadwi`, `jmpeqi`, …) compute directly
//! from the literal word instead of materializing it through a reserved
//! scratch register first (that register has no backing storage in this
//! implementation — it exists only as an illegal operand), and `swap`
//! performs a true value exchange rather than the original's
//! register-index-instead-of-value bug.

use crate::common::error::Trap;
use crate::isa::opcodes::names::*;
use crate::isa::Instruction;

use super::Cpu;

/// Outcome of executing one instruction, signaling to `step` whether to
/// advance `PC` normally or a jump/trap already redirected it.
pub(super) enum Flow {
    Next,
    Jumped,
}

impl Cpu {
    pub(super) fn execute(&mut self, inst: Instruction) -> Result<Flow, Trap> {
        let user = self.regs.user();
        match inst.opcode {
            NOP => Ok(Flow::Next),

            SAVEW => {
                let val = self.regs.read(inst.reg1(), user)?;
                self.store_word(inst.op2, val)?;
                Ok(Flow::Next)
            }
            LOADW => {
                let val = self.load_word(inst.op2)?;
                self.write_reg(inst.reg1(), val, user)?;
                Ok(Flow::Next)
            }
            SAVEB => {
                let val = self.regs.read(inst.reg1(), user)? as u8;
                self.store_byte(inst.op2, val)?;
                Ok(Flow::Next)
            }
            LOADB => {
                let val = self.load_byte(inst.op2)?;
                self.write_reg(inst.reg1(), u32::from(val), user)?;
                Ok(Flow::Next)
            }
            SAVEWR => {
                let val = self.regs.read(inst.reg1(), user)?;
                let addr = self.regs.read(inst.reg2(), user)?;
                self.store_word(addr, val)?;
                Ok(Flow::Next)
            }
            LOADWR => {
                let addr = self.regs.read(inst.reg2(), user)?;
                let val = self.load_word(addr)?;
                self.write_reg(inst.reg1(), val, user)?;
                Ok(Flow::Next)
            }
            SAVEBR => {
                let val = self.regs.read(inst.reg1(), user)? as u8;
                let addr = self.regs.read(inst.reg2(), user)?;
                self.store_byte(addr, val)?;
                Ok(Flow::Next)
            }
            LOADBR => {
                let addr = self.regs.read(inst.reg2(), user)?;
                let val = self.load_byte(addr)?;
                self.write_reg(inst.reg1(), u32::from(val), user)?;
                Ok(Flow::Next)
            }
            SAVEWI => {
                self.store_word(inst.op2, inst.op1)?;
                Ok(Flow::Next)
            }
            LOADWI => {
                self.write_reg(inst.reg1(), inst.op2, user)?;
                Ok(Flow::Next)
            }
            SAVEBI => {
                self.store_byte(inst.op2, inst.op1 as u8)?;
                Ok(Flow::Next)
            }
            LOADBI => {
                self.write_reg(inst.reg1(), inst.op2 & 0xFF, user)?;
                Ok(Flow::Next)
            }
            SAVEWRI => {
                let addr = self.regs.read(inst.reg2(), user)?;
                self.store_word(addr, inst.op1)?;
                Ok(Flow::Next)
            }
            SAVEBRI => {
                let addr = self.regs.read(inst.reg2(), user)?;
                self.store_byte(addr, inst.op1 as u8)?;
                Ok(Flow::Next)
            }

            ADD => {
                self.binary_arith(inst, user, |a, b| {
                    let sum = u64::from(a) + u64::from(b);
                    (sum as u32, sum > u64::from(u32::MAX))
                })?;
                Ok(Flow::Next)
            }
            SUB => {
                let a = self.regs.read(inst.reg1(), user)?;
                let b = self.regs.read(inst.reg2(), user)?;
                self.write_reg(inst.reg3(), a.wrapping_sub(b), user)?;
                self.regs.set_carry(false);
                Ok(Flow::Next)
            }
            MUL => {
                self.binary_arith(inst, user, |a, b| {
                    let product = u64::from(a) * u64::from(b);
                    (product as u32, product > u64::from(u32::MAX))
                })?;
                Ok(Flow::Next)
            }
            DIV => {
                self.div_mod(inst, user, |q, _r| q)?;
                Ok(Flow::Next)
            }
            MOD => {
                self.div_mod(inst, user, |_q, r| r)?;
                Ok(Flow::Next)
            }
            ADDI => {
                let a = self.regs.read(inst.reg1(), user)?;
                let sum = u64::from(a) + u64::from(inst.op2);
                self.write_reg(inst.reg3(), sum as u32, user)?;
                self.regs.set_carry(sum > u64::from(u32::MAX));
                Ok(Flow::Next)
            }
            SUBI => {
                let a = self.regs.read(inst.reg1(), user)?;
                self.write_reg(inst.reg3(), a.wrapping_sub(inst.op2), user)?;
                self.regs.set_carry(false);
                Ok(Flow::Next)
            }
            MULI => {
                let a = self.regs.read(inst.reg1(), user)?;
                let product = u64::from(a) * u64::from(inst.op2);
                self.write_reg(inst.reg3(), product as u32, user)?;
                self.regs.set_carry(product > u64::from(u32::MAX));
                Ok(Flow::Next)
            }
            DIVI => {
                if inst.op2 == 0 {
                    return Err(Trap::DivisionByZero);
                }
                let a = self.regs.read(inst.reg1(), user)?;
                self.write_reg(inst.reg3(), a.wrapping_div(inst.op2), user)?;
                self.regs.set_carry(false);
                Ok(Flow::Next)
            }
            MODI => {
                if inst.op2 == 0 {
                    return Err(Trap::DivisionByZero);
                }
                let a = self.regs.read(inst.reg1(), user)?;
                self.write_reg(inst.reg3(), a.wrapping_rem(inst.op2), user)?;
                self.regs.set_carry(false);
                Ok(Flow::Next)
            }

            JMP => {
                self.regs.set_pc(inst.op1);
                Ok(Flow::Jumped)
            }
            JMPR => {
                let target = self.regs.read(inst.reg1(), user)?;
                self.regs.set_pc(target);
                Ok(Flow::Jumped)
            }

            JMPLT => self.cond_jump_rr(inst, user, |a, b| a < b),
            JMPGT => self.cond_jump_rr(inst, user, |a, b| a > b),
            JMPLE => self.cond_jump_rr(inst, user, |a, b| a <= b),
            JMPGE => self.cond_jump_rr(inst, user, |a, b| a >= b),
            JMPEQ => self.cond_jump_rr_unsigned(inst, user, |a, b| a == b),
            JMPNE => self.cond_jump_rr_unsigned(inst, user, |a, b| a != b),

            JMPLTI => self.cond_jump_ri(inst, user, |a, b| a < b),
            JMPGTI => self.cond_jump_ri(inst, user, |a, b| a > b),
            JMPLEI => self.cond_jump_ri(inst, user, |a, b| a <= b),
            JMPGEI => self.cond_jump_ri(inst, user, |a, b| a >= b),
            JMPEQI => self.cond_jump_ri_unsigned(inst, user, |a, b| a == b),
            JMPNEI => self.cond_jump_ri_unsigned(inst, user, |a, b| a != b),

            JMPLTR => self.cond_jump_rr_target_reg(inst, user, |a, b| a < b),
            JMPGTR => self.cond_jump_rr_target_reg(inst, user, |a, b| a > b),
            JMPLER => self.cond_jump_rr_target_reg(inst, user, |a, b| a <= b),
            JMPGER => self.cond_jump_rr_target_reg(inst, user, |a, b| a >= b),
            JMPEQR => self.cond_jump_rr_target_reg_unsigned(inst, user, |a, b| a == b),
            JMPNER => self.cond_jump_rr_target_reg_unsigned(inst, user, |a, b| a != b),

            JMPLTRI => self.cond_jump_ri_target_reg(inst, user, |a, b| a < b),
            JMPGTRI => self.cond_jump_ri_target_reg(inst, user, |a, b| a > b),
            JMPLERI => self.cond_jump_ri_target_reg(inst, user, |a, b| a <= b),
            JMPGERI => self.cond_jump_ri_target_reg(inst, user, |a, b| a >= b),
            JMPEQRI => self.cond_jump_ri_target_reg_unsigned(inst, user, |a, b| a == b),
            JMPNERI => self.cond_jump_ri_target_reg_unsigned(inst, user, |a, b| a != b),

            HALT => {
                self.halted = true;
                self.exit_code = Some(0);
                Ok(Flow::Next)
            }
            INTR => {
                if self.regs.intr() {
                    let pc_after = self.regs.pc().wrapping_add(16);
                    self.enter_trap(crate::common::constants::VEC_INTERRUPT, pc_after);
                    Ok(Flow::Jumped)
                } else {
                    crate::soc::intc::InterruptSink::intr(&self.interrupts);
                    Ok(Flow::Next)
                }
            }
            RFE => {
                self.return_from_exception();
                Ok(Flow::Jumped)
            }
            WAIT => {
                while !self.interrupts.is_pending() && !self.halted {
                    std::thread::sleep(std::time::Duration::from_millis(1));
                }
                Ok(Flow::Next)
            }

            SWAP => {
                let a = self.regs.read(inst.reg1(), user)?;
                let b = self.regs.read(inst.reg2(), user)?;
                self.write_reg(inst.reg1(), b, user)?;
                self.write_reg(inst.reg2(), a, user)?;
                Ok(Flow::Next)
            }
            COPY => {
                let val = self.regs.read(inst.reg2(), user)?;
                self.write_reg(inst.reg1(), val, user)?;
                Ok(Flow::Next)
            }
            AND => {
                self.binary_logic(inst, user, |a, b| a & b)?;
                Ok(Flow::Next)
            }
            OR => {
                self.binary_logic(inst, user, |a, b| a | b)?;
                Ok(Flow::Next)
            }
            XOR => {
                self.binary_logic(inst, user, |a, b| a ^ b)?;
                Ok(Flow::Next)
            }
            ANDI => {
                let a = self.regs.read(inst.reg1(), user)?;
                self.write_reg(inst.reg3(), a & inst.op2, user)?;
                Ok(Flow::Next)
            }
            ORI => {
                let a = self.regs.read(inst.reg1(), user)?;
                self.write_reg(inst.reg3(), a | inst.op2, user)?;
                Ok(Flow::Next)
            }
            XORI => {
                let a = self.regs.read(inst.reg1(), user)?;
                self.write_reg(inst.reg3(), a ^ inst.op2, user)?;
                Ok(Flow::Next)
            }
            NOT => {
                let a = self.regs.read(inst.reg2(), user)?;
                self.write_reg(inst.reg1(), !a, user)?;
                Ok(Flow::Next)
            }
            SHL => {
                self.binary_logic(inst, user, |a, b| shift_left(a, b))?;
                Ok(Flow::Next)
            }
            SHR => {
                self.binary_logic(inst, user, |a, b| shift_right(a, b))?;
                Ok(Flow::Next)
            }
            SHLI => {
                let a = self.regs.read(inst.reg1(), user)?;
                self.write_reg(inst.reg3(), shift_left(a, inst.op2), user)?;
                Ok(Flow::Next)
            }
            SHRI => {
                let a = self.regs.read(inst.reg1(), user)?;
                self.write_reg(inst.reg3(), shift_right(a, inst.op2), user)?;
                Ok(Flow::Next)
            }

            CPUID => {
                self.regs
                    .write_internal(crate::common::constants::REG_RESULT, crate::common::constants::CPU_VERSION)?;
                Ok(Flow::Next)
            }
            STRAPR => {
                let target = self.regs.read(inst.reg1(), user)?;
                self.install_jump_stub(inst.op2, target);
                Ok(Flow::Next)
            }
            STRAPI => {
                let slot = crate::common::constants::TRAP_APERTURE_BASE + inst.op1 * 16;
                self.install_jump_stub(slot, inst.op2);
                Ok(Flow::Next)
            }

            _ => Err(Trap::IllegalInstruction),
        }
    }

    /// Writes a register and, if the destination is `BASEPTR` or `STATUS`,
    /// invalidates the MMU's translation memo. Both are privilege-gated by
    /// `self.regs.write` itself, but any instruction whose destination
    /// operand happens to name one switches (or may switch) the active
    /// address space, so the memo — keyed on virtual page alone, not on
    /// `BASEPTR` — can no longer be trusted once either changes.
    fn write_reg(&mut self, idx: u8, val: u32, user: bool) -> Result<(), Trap> {
        self.regs.write(idx, val, user)?;
        if matches!(
            idx,
            crate::common::constants::REG_BASEPTR | crate::common::constants::REG_STATUS
        ) {
            self.mmu.invalidate();
        }
        Ok(())
    }

    fn binary_arith(
        &mut self,
        inst: Instruction,
        user: bool,
        op: impl Fn(u32, u32) -> (u32, bool),
    ) -> Result<(), Trap> {
        let a = self.regs.read(inst.reg1(), user)?;
        let b = self.regs.read(inst.reg2(), user)?;
        let (result, carry) = op(a, b);
        self.write_reg(inst.reg3(), result, user)?;
        self.regs.set_carry(carry);
        Ok(())
    }

    fn binary_logic(&mut self, inst: Instruction, user: bool, op: impl Fn(u32, u32) -> u32) -> Result<(), Trap> {
        let a = self.regs.read(inst.reg1(), user)?;
        let b = self.regs.read(inst.reg2(), user)?;
        self.write_reg(inst.reg3(), op(a, b), user)?;
        Ok(())
    }

    fn div_mod(&mut self, inst: Instruction, user: bool, pick: impl Fn(u32, u32) -> u32) -> Result<(), Trap> {
        let a = self.regs.read(inst.reg1(), user)?;
        let b = self.regs.read(inst.reg2(), user)?;
        if b == 0 {
            return Err(Trap::DivisionByZero);
        }
        let result = pick(a.wrapping_div(b), a.wrapping_rem(b));
        self.write_reg(inst.reg3(), result, user)?;
        self.regs.set_carry(false);
        Ok(())
    }

    fn cond_jump_rr(&mut self, inst: Instruction, user: bool, cmp: impl Fn(i32, i32) -> bool) -> Result<Flow, Trap> {
        let a = self.regs.read(inst.reg1(), user)? as i32;
        let b = self.regs.read(inst.reg2(), user)? as i32;
        Ok(self.maybe_jump(cmp(a, b), inst.op3))
    }

    fn cond_jump_rr_unsigned(
        &mut self,
        inst: Instruction,
        user: bool,
        cmp: impl Fn(u32, u32) -> bool,
    ) -> Result<Flow, Trap> {
        let a = self.regs.read(inst.reg1(), user)?;
        let b = self.regs.read(inst.reg2(), user)?;
        Ok(self.maybe_jump(cmp(a, b), inst.op3))
    }

    fn cond_jump_ri(&mut self, inst: Instruction, user: bool, cmp: impl Fn(i32, i32) -> bool) -> Result<Flow, Trap> {
        let a = self.regs.read(inst.reg1(), user)? as i32;
        let b = inst.op2 as i32;
        Ok(self.maybe_jump(cmp(a, b), inst.op3))
    }

    fn cond_jump_ri_unsigned(
        &mut self,
        inst: Instruction,
        user: bool,
        cmp: impl Fn(u32, u32) -> bool,
    ) -> Result<Flow, Trap> {
        let a = self.regs.read(inst.reg1(), user)?;
        Ok(self.maybe_jump(cmp(a, inst.op2), inst.op3))
    }

    fn cond_jump_rr_target_reg(
        &mut self,
        inst: Instruction,
        user: bool,
        cmp: impl Fn(i32, i32) -> bool,
    ) -> Result<Flow, Trap> {
        let a = self.regs.read(inst.reg1(), user)? as i32;
        let b = self.regs.read(inst.reg2(), user)? as i32;
        let target = self.regs.read(inst.reg3(), user)?;
        Ok(self.maybe_jump(cmp(a, b), target))
    }

    fn cond_jump_rr_target_reg_unsigned(
        &mut self,
        inst: Instruction,
        user: bool,
        cmp: impl Fn(u32, u32) -> bool,
    ) -> Result<Flow, Trap> {
        let a = self.regs.read(inst.reg1(), user)?;
        let b = self.regs.read(inst.reg2(), user)?;
        let target = self.regs.read(inst.reg3(), user)?;
        Ok(self.maybe_jump(cmp(a, b), target))
    }

    fn cond_jump_ri_target_reg(
        &mut self,
        inst: Instruction,
        user: bool,
        cmp: impl Fn(i32, i32) -> bool,
    ) -> Result<Flow, Trap> {
        let a = self.regs.read(inst.reg1(), user)? as i32;
        let b = inst.op2 as i32;
        let target = self.regs.read(inst.reg3(), user)?;
        Ok(self.maybe_jump(cmp(a, b), target))
    }

    fn cond_jump_ri_target_reg_unsigned(
        &mut self,
        inst: Instruction,
        user: bool,
        cmp: impl Fn(u32, u32) -> bool,
    ) -> Result<Flow, Trap> {
        let a = self.regs.read(inst.reg1(), user)?;
        let target = self.regs.read(inst.reg3(), user)?;
        Ok(self.maybe_jump(cmp(a, inst.op2), target))
    }

    fn maybe_jump(&mut self, take: bool, target: u32) -> Flow {
        if take {
            self.regs.set_pc(target);
            Flow::Jumped
        } else {
            Flow::Next
        }
    }
}

fn shift_left(val: u32, amount: u32) -> u32 {
    if amount >= 32 {
        0
    } else {
        val << amount
    }
}

fn shift_right(val: u32, amount: u32) -> u32 {
    if amount >= 32 {
        0
    } else {
        val >> amount
    }
}
