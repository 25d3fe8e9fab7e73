//! Register file.
//!
//! Holds the 32 general-purpose registers plus the eight named special
//! registers (`PC`, `SP`, `RESULT`, `CARRY`, `RETURN`, `STATUS`, `VADDR`,
//! `BASEPTR`). Three of the named registers are privileged: reading or
//! writing them while `STATUS.USER` is set is rejected so the caller can
//! convert the failure into an illegal-instruction trap. The reserved
//! scratch register (`RSVD`) has no backing storage here at all — any
//! instruction naming it is rejected unconditionally by the bounds check.

use crate::common::constants::{
    REG_BASEPTR, REG_CARRY, REG_PC, REG_R0, REG_R31, REG_RESULT, REG_RETURN, REG_RSVD, REG_SP,
    REG_STATUS, REG_VADDR,
};
use crate::common::error::Trap;

/// Bit position of `STATUS.MMU_ENABLE`.
pub const STATUS_MMU_ENABLE: u32 = 31;
/// Bit position of `STATUS.USER_OLD`.
pub const STATUS_USER_OLD: u32 = 5;
/// Bit position of `STATUS.INTR_OLD`.
pub const STATUS_INTR_OLD: u32 = 4;
/// Bit position of `STATUS.USER_PREV`.
pub const STATUS_USER_PREV: u32 = 3;
/// Bit position of `STATUS.INTR_PREV`.
pub const STATUS_INTR_PREV: u32 = 2;
/// Bit position of `STATUS.USER`.
pub const STATUS_USER: u32 = 1;
/// Bit position of `STATUS.INTR`.
pub const STATUS_INTR: u32 = 0;

/// Architectural register file.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    gpr: [u32; 32],
    pc: u32,
    sp: u32,
    result: u32,
    carry: u32,
    ret: u32,
    status: u32,
    vaddr: u32,
    baseptr: u32,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    /// Creates a register file with every register zeroed, matching the
    /// boot state: PC=0, MMU disabled, USER=0, INTR=0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gpr: [0; 32],
            pc: 0,
            sp: 0,
            result: 0,
            carry: 0,
            ret: 0,
            status: 0,
            vaddr: 0,
            baseptr: 0,
        }
    }

    fn is_privileged(idx: u8) -> bool {
        matches!(idx, REG_STATUS | REG_VADDR | REG_BASEPTR)
    }

    /// Reads a register, honoring the user/privileged gate.
    ///
    /// # Errors
    ///
    /// Returns `Trap::IllegalInstruction` if `idx` names the reserved
    /// scratch register, is out of range, or names a privileged register
    /// while `user_mode` is `true`.
    pub fn read(&self, idx: u8, user_mode: bool) -> Result<u32, Trap> {
        if user_mode && Self::is_privileged(idx) {
            return Err(Trap::IllegalInstruction);
        }
        self.read_internal(idx)
    }

    /// Writes a register, honoring the user/privileged gate.
    ///
    /// # Errors
    ///
    /// Same conditions as [`RegisterFile::read`].
    pub fn write(&mut self, idx: u8, val: u32, user_mode: bool) -> Result<(), Trap> {
        if user_mode && Self::is_privileged(idx) {
            return Err(Trap::IllegalInstruction);
        }
        self.write_internal(idx, val)
    }

    /// Reads a register bypassing the privilege gate. Used by the trap
    /// machinery itself, which must manipulate `STATUS` regardless of the
    /// mode it is trapping out of.
    ///
    /// # Errors
    ///
    /// Returns `Trap::IllegalInstruction` if `idx` names the reserved
    /// scratch register or is out of range.
    pub fn read_internal(&self, idx: u8) -> Result<u32, Trap> {
        match idx {
            REG_R0..=REG_R31 => Ok(self.gpr[idx as usize]),
            REG_PC => Ok(self.pc),
            REG_SP => Ok(self.sp),
            REG_RESULT => Ok(self.result),
            REG_CARRY => Ok(self.carry),
            REG_RETURN => Ok(self.ret),
            REG_STATUS => Ok(self.status),
            REG_VADDR => Ok(self.vaddr),
            REG_BASEPTR => Ok(self.baseptr),
            _ => Err(Trap::IllegalInstruction),
        }
    }

    /// Writes a register bypassing the privilege gate.
    ///
    /// # Errors
    ///
    /// Same as [`RegisterFile::read_internal`].
    pub fn write_internal(&mut self, idx: u8, val: u32) -> Result<(), Trap> {
        match idx {
            REG_R0..=REG_R31 => self.gpr[idx as usize] = val,
            REG_PC => self.pc = val,
            REG_SP => self.sp = val,
            REG_RESULT => self.result = val,
            REG_CARRY => self.carry = val,
            REG_RETURN => self.ret = val,
            REG_STATUS => self.status = val,
            REG_VADDR => self.vaddr = val,
            REG_BASEPTR => self.baseptr = val,
            REG_RSVD => return Err(Trap::IllegalInstruction),
            _ => return Err(Trap::IllegalInstruction),
        }
        Ok(())
    }

    /// Program counter.
    #[must_use]
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Sets the program counter directly (bypasses the privilege gate;
    /// `PC` is user-accessible, but the trap machinery also needs this for
    /// redirects that don't go through an instruction's register-write
    /// path).
    pub fn set_pc(&mut self, val: u32) {
        self.pc = val;
    }

    /// Raw `STATUS` value.
    #[must_use]
    pub fn status(&self) -> u32 {
        self.status
    }

    /// `BASEPTR` value.
    #[must_use]
    pub fn baseptr(&self) -> u32 {
        self.baseptr
    }

    /// Sets `VADDR` (done by the MMU on page fault).
    pub fn set_vaddr(&mut self, val: u32) {
        self.vaddr = val;
    }

    /// Sets `RETURN` (done by the trap machinery on trap entry).
    pub fn set_return(&mut self, val: u32) {
        self.ret = val;
    }

    /// `RETURN` value.
    #[must_use]
    pub fn ret(&self) -> u32 {
        self.ret
    }

    /// Sets `CARRY` to 0 or 1.
    pub fn set_carry(&mut self, carry: bool) {
        self.carry = u32::from(carry);
    }

    fn status_bit(&self, bit: u32) -> bool {
        (self.status >> bit) & 1 != 0
    }

    fn set_status_bit(&mut self, bit: u32, value: bool) {
        if value {
            self.status |= 1 << bit;
        } else {
            self.status &= !(1 << bit);
        }
    }

    /// Whether the MMU is enabled.
    #[must_use]
    pub fn mmu_enabled(&self) -> bool {
        self.status_bit(STATUS_MMU_ENABLE)
    }

    /// Whether the current privilege level is user mode.
    #[must_use]
    pub fn user(&self) -> bool {
        self.status_bit(STATUS_USER)
    }

    /// Whether interrupts are currently enabled.
    #[must_use]
    pub fn intr(&self) -> bool {
        self.status_bit(STATUS_INTR)
    }

    /// Sets `STATUS.INTR` directly, without the shadow-shift that trap
    /// entry/return perform. The caller is responsible for delivering any
    /// pending interrupt if this newly sets the bit (§4.1).
    pub fn set_intr(&mut self, value: bool) {
        self.set_status_bit(STATUS_INTR, value);
    }

    /// Sets `STATUS.USER` directly.
    pub fn set_user(&mut self, value: bool) {
        self.set_status_bit(STATUS_USER, value);
    }

    /// Shifts the USER/INTR shadow slots right on trap entry: current
    /// becomes previous, previous becomes old, old is discarded. The new
    /// current USER/INTR are cleared (kernel mode, interrupts disabled).
    pub fn shift_shadows_on_trap_entry(&mut self) {
        let user_prev = self.status_bit(STATUS_USER);
        let intr_prev = self.status_bit(STATUS_INTR);
        let user_cur_prev = self.status_bit(STATUS_USER_PREV);
        let intr_cur_prev = self.status_bit(STATUS_INTR_PREV);

        self.set_status_bit(STATUS_USER_OLD, user_cur_prev);
        self.set_status_bit(STATUS_INTR_OLD, intr_cur_prev);
        self.set_status_bit(STATUS_USER_PREV, user_prev);
        self.set_status_bit(STATUS_INTR_PREV, intr_prev);
        self.set_status_bit(STATUS_USER, false);
        self.set_status_bit(STATUS_INTR, false);
    }

    /// Shifts the USER/INTR shadow slots left on return-from-exception:
    /// previous becomes current, old becomes previous.
    pub fn shift_shadows_on_rfe(&mut self) {
        let user_prev = self.status_bit(STATUS_USER_PREV);
        let intr_prev = self.status_bit(STATUS_INTR_PREV);
        let user_old = self.status_bit(STATUS_USER_OLD);
        let intr_old = self.status_bit(STATUS_INTR_OLD);

        self.set_status_bit(STATUS_USER, user_prev);
        self.set_status_bit(STATUS_INTR, intr_prev);
        self.set_status_bit(STATUS_USER_PREV, user_old);
        self.set_status_bit(STATUS_INTR_PREV, intr_old);
    }

    /// Dumps all registers to stdout, used when the machine halts.
    pub fn dump(&self) {
        for (i, v) in self.gpr.iter().enumerate() {
            println!("r{i:<2} = {v:#010x}");
        }
        println!("pc      = {:#010x}", self.pc);
        println!("sp      = {:#010x}", self.sp);
        println!("result  = {:#010x}", self.result);
        println!("carry   = {:#010x}", self.carry);
        println!("return  = {:#010x}", self.ret);
        println!("status  = {:#010x}", self.status);
        println!("vaddr   = {:#010x}", self.vaddr);
        println!("baseptr = {:#010x}", self.baseptr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privileged_register_rejects_user_mode() {
        let mut regs = RegisterFile::new();
        assert_eq!(
            regs.write(REG_STATUS, 0xFF, true),
            Err(Trap::IllegalInstruction)
        );
        assert_eq!(regs.status(), 0);
    }

    #[test]
    fn rsvd_always_illegal() {
        let mut regs = RegisterFile::new();
        assert_eq!(
            regs.write(REG_RSVD, 1, false),
            Err(Trap::IllegalInstruction)
        );
        assert_eq!(regs.read(REG_RSVD, false), Err(Trap::IllegalInstruction));
    }

    #[test]
    fn shadow_shift_round_trips() {
        let mut regs = RegisterFile::new();
        regs.set_user(true);
        regs.set_intr(true);
        let before = regs.status();
        regs.shift_shadows_on_trap_entry();
        assert!(!regs.user());
        assert!(!regs.intr());
        regs.shift_shadows_on_rfe();
        assert_eq!(regs.status(), before);
    }
}
