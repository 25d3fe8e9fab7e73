//! Memory Management Unit.
//!
//! Walks the two-level page table rooted at `BASEPTR`, checking permissions
//! and maintaining the accessed/dirty bits. A small translation memo is kept
//! (keyed by the containing page's virtual base) to skip the page-table walk
//! on repeat accesses to the same page; per the design notes this is purely
//! an optimization and is invalidated aggressively rather than precisely.

use std::collections::HashMap;

use crate::common::data::AccessMask;
use crate::common::error::Trap;
use crate::core::pte::Pte;

/// Physical memory as seen by the MMU: plain 32-bit big-endian word access,
/// with no further translation or MMIO semantics. Implemented by the system
/// bus for in-RAM page-table reads and writebacks.
pub trait PhysMem {
    /// Reads a 32-bit big-endian word at a physical address.
    fn read_phys_u32(&mut self, addr: u32) -> u32;
    /// Writes a 32-bit big-endian word at a physical address.
    fn write_phys_u32(&mut self, addr: u32, val: u32);
}

#[derive(Clone, Copy)]
struct MemoEntry {
    pte_addr: u32,
    superpage: bool,
}

/// Virtual-to-physical address translator.
#[derive(Default)]
pub struct Mmu {
    memo: HashMap<u32, MemoEntry>,
}

impl Mmu {
    /// Creates an MMU with an empty translation memo.
    #[must_use]
    pub fn new() -> Self {
        Self {
            memo: HashMap::new(),
        }
    }

    /// Drops every memoized translation. Must be called whenever a write
    /// retires through the bus, `BASEPTR` changes, or `STATUS.MMU_ENABLE`
    /// toggles.
    pub fn invalidate(&mut self) {
        self.memo.clear();
    }

    /// Translates a virtual address, returning the physical address or the
    /// trap to raise.
    ///
    /// # Errors
    ///
    /// `Trap::BadBasePointer` if `baseptr + 4096` would overflow 32 bits.
    /// `Trap::PageFault` if the permission mask isn't satisfied, the page
    /// isn't present, or a user-mode access targets a kernel-only page.
    pub fn translate(
        &mut self,
        bus: &mut impl PhysMem,
        baseptr: u32,
        user_mode: bool,
        vaddr: u32,
        mask: AccessMask,
    ) -> Result<u32, Trap> {
        if baseptr.checked_add(crate::common::constants::PTE_TABLE_SIZE).is_none() {
            return Err(Trap::BadBasePointer);
        }

        let lvl1_index = (vaddr >> 22) & 0x3FF;
        let lvl2_index = (vaddr >> 12) & 0x3FF;

        let page_key = vaddr & !0x3FF_FFF; // 4 MiB granularity is enough to detect superpage reuse
        let memo = self.memo.get(&(vaddr & !0xFFF)).copied();

        let (pte, pte_addr, page_base, superpage) = if let Some(entry) = memo {
            let pte = Pte::decode(bus.read_phys_u32(entry.pte_addr));
            (pte, entry.pte_addr, pte.frame_base(), entry.superpage)
        } else {
            let lvl1_addr = baseptr.wrapping_add(lvl1_index * 4);
            let lvl1_pte = Pte::decode(bus.read_phys_u32(lvl1_addr));

            if lvl1_pte.physical {
                (lvl1_pte, lvl1_addr, lvl1_pte.frame_base(), true)
            } else {
                let lvl2_addr = lvl1_pte.frame_base().wrapping_add(lvl2_index * 4);
                let lvl2_pte = Pte::decode(bus.read_phys_u32(lvl2_addr));
                (lvl2_pte, lvl2_addr, lvl2_pte.frame_base(), false)
            }
        };
        let _ = page_key;

        if !pte.present {
            return Err(Trap::PageFault);
        }
        if !mask.satisfied_by(pte.read, pte.write, pte.execute) {
            return Err(Trap::PageFault);
        }
        if user_mode && !pte.user {
            return Err(Trap::PageFault);
        }

        let mut updated = pte;
        if mask.read {
            updated.accessed = true;
        }
        if mask.write {
            updated.dirty = true;
        }
        if updated != pte {
            bus.write_phys_u32(pte_addr, updated.encode());
        }

        self.memo.insert(
            vaddr & !0xFFF,
            MemoEntry {
                pte_addr,
                superpage,
            },
        );

        let offset_mask = if superpage { 0x3F_FFFF } else { 0xFFF };
        Ok(page_base.wrapping_add(vaddr & offset_mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeMem(std::collections::HashMap<u32, u32>);

    impl PhysMem for FakeMem {
        fn read_phys_u32(&mut self, addr: u32) -> u32 {
            *self.0.get(&addr).unwrap_or(&0)
        }
        fn write_phys_u32(&mut self, addr: u32, val: u32) {
            self.0.insert(addr, val);
        }
    }

    #[test]
    fn page_fault_before_accessed_bit_set() {
        let mut mem = FakeMem(std::collections::HashMap::new());
        let pte = Pte {
            pfn: 0x10,
            read: true,
            write: false,
            execute: false,
            present: true,
            ..Default::default()
        };
        mem.write_phys_u32(0x2000, pte.encode());
        let mut mmu = Mmu::new();
        let result = mmu.translate(&mut mem, 0x2000, false, 0, AccessMask::WRITE);
        assert_eq!(result, Err(Trap::PageFault));
        let after = Pte::decode(mem.read_phys_u32(0x2000));
        assert!(!after.accessed);
    }

    #[test]
    fn identity_translation_outside_mmu_is_caller_responsibility() {
        // The MMU itself always walks tables; bypass-when-disabled is the
        // CPU's job (it only calls translate() when STATUS.MMU_ENABLE is set).
        let mut mem = FakeMem(std::collections::HashMap::new());
        let pte = Pte {
            pfn: 0,
            read: true,
            write: true,
            execute: true,
            present: true,
            user: true,
            ..Default::default()
        };
        mem.write_phys_u32(0, pte.encode());
        let mut mmu = Mmu::new();
        let result = mmu.translate(&mut mem, 0, false, 0x100, AccessMask::READ);
        assert_eq!(result, Ok(0x100));
    }
}
