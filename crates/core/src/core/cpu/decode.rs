//! Instruction fetch and the address-translation helpers `execute` uses for
//! every load/store.
//!
//! The trap-vector aperture always bypasses the MMU (§4.7); everything else
//! goes through [`crate::core::mmu::Mmu`] only while `STATUS.MMU_ENABLE` is
//! set, matching the original's flat-memory model when translation is off.

use crate::common::constants::{INSTRUCTION_WORD_SIZE, TRAP_APERTURE_BASE};
use crate::common::data::AccessMask;
use crate::common::error::Trap;
use crate::isa::Instruction;

use super::Cpu;

impl Cpu {
    fn translate(&mut self, vaddr: u32, mask: AccessMask) -> Result<u32, Trap> {
        if vaddr >= TRAP_APERTURE_BASE {
            return Ok(vaddr);
        }
        if self.regs.mmu_enabled() {
            self.mmu
                .translate(&mut self.bus.bus, self.regs.baseptr(), self.regs.user(), vaddr, mask)
        } else {
            Ok(vaddr)
        }
    }

    /// Fetches and decodes the instruction at the current `PC`.
    pub(super) fn fetch(&mut self) -> Result<Instruction, Trap> {
        let pc = self.regs.pc();
        let phys = self.translate(pc, AccessMask::EXECUTE)?;
        let opcode_word = self.bus.bus.read_u32(phys);
        let op1 = self.bus.bus.read_u32(phys.wrapping_add(INSTRUCTION_WORD_SIZE));
        let op2 = self.bus.bus.read_u32(phys.wrapping_add(2 * INSTRUCTION_WORD_SIZE));
        let op3 = self.bus.bus.read_u32(phys.wrapping_add(3 * INSTRUCTION_WORD_SIZE));
        Instruction::decode(opcode_word, op1, op2, op3)
    }

    /// Reads a 32-bit big-endian word, trapping if `vaddr + 3` would
    /// overflow the address space (mirrors the original's explicit bound
    /// check on word-sized accesses). Each of the four bytes is translated
    /// independently, same as `load_byte` — a word access straddling a page
    /// boundary spans two PTEs, and a fault on any byte must abort the
    /// whole access rather than silently reading across into the next
    /// page's physical frame.
    pub(super) fn load_word(&mut self, vaddr: u32) -> Result<u32, Trap> {
        if vaddr.checked_add(3).is_none() {
            return Err(Trap::IllegalInstruction);
        }
        let mut word = 0u32;
        for i in 0..4 {
            let byte = self.load_byte(vaddr.wrapping_add(i))?;
            word = (word << 8) | u32::from(byte);
        }
        Ok(word)
    }

    /// Writes a 32-bit big-endian word, one byte at a time with independent
    /// translation per byte (see `load_word`), invalidating the MMU's
    /// translation memo after each byte (a store may have just modified a
    /// page table).
    pub(super) fn store_word(&mut self, vaddr: u32, val: u32) -> Result<(), Trap> {
        if vaddr.checked_add(3).is_none() {
            return Err(Trap::IllegalInstruction);
        }
        for i in 0..4 {
            let shift = 24 - i * 8;
            let byte = (val >> shift) as u8;
            self.store_byte(vaddr.wrapping_add(i), byte)?;
        }
        Ok(())
    }

    /// Reads one byte.
    pub(super) fn load_byte(&mut self, vaddr: u32) -> Result<u8, Trap> {
        let phys = self.translate(vaddr, AccessMask::READ)?;
        Ok(self.bus.bus.read_u8(phys))
    }

    /// Writes one byte, invalidating the MMU's translation memo afterward.
    pub(super) fn store_byte(&mut self, vaddr: u32, val: u8) -> Result<(), Trap> {
        let phys = self.translate(vaddr, AccessMask::WRITE)?;
        self.bus.bus.write_u8(phys, val);
        self.mmu.invalidate();
        Ok(())
    }

    /// Installs a `jmp <target>` instruction at the given address, used by
    /// `strapr`/`strapi` to populate a trap vector slot. Bypasses address
    /// translation entirely: the slot named is almost always in the trap
    /// aperture, which is always physical, and the instruction itself
    /// doesn't go through the normal store path (no MMU memo invalidation
    /// is warranted for a code write).
    pub(super) fn install_jump_stub(&mut self, addr: u32, target: u32) {
        use crate::isa::opcodes::names::JMP;
        self.bus.bus.write_u32(addr, u32::from(JMP));
        self.bus.bus.write_u32(addr.wrapping_add(4), target);
        self.bus.bus.write_u32(addr.wrapping_add(8), 0);
        self.bus.bus.write_u32(addr.wrapping_add(12), 0);
    }
}
