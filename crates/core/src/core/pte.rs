//! Page Table Entry codec.
//!
//! A PTE is a plain 32-bit big-endian value in memory; this module is the
//! only place that packs and unpacks its fields. Round-tripping any legal
//! PTE through `decode`/`encode` returns the original bits modulo the three
//! reserved low bits, which are always encoded as zero.

/// One decoded page table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Pte {
    /// 20-bit physical frame number (bits [31:12]).
    pub pfn: u32,
    /// Execute permission (bit 11).
    pub execute: bool,
    /// Write permission (bit 10).
    pub write: bool,
    /// Read permission (bit 9).
    pub read: bool,
    /// Dirty bit (bit 8), set by the MMU on a successful write.
    pub dirty: bool,
    /// Accessed bit (bit 7), set by the MMU on any successful access.
    pub accessed: bool,
    /// OS-reserved usable bit (bit 6); the emulator never interprets it.
    pub usable: bool,
    /// User-accessible bit (bit 5).
    pub user: bool,
    /// Physical/superpage bit (bit 4); only meaningful in a first-level PTE.
    pub physical: bool,
    /// Present bit (bit 3).
    pub present: bool,
}

const PFN_SHIFT: u32 = 12;
const BIT_EXECUTE: u32 = 11;
const BIT_WRITE: u32 = 10;
const BIT_READ: u32 = 9;
const BIT_DIRTY: u32 = 8;
const BIT_ACCESSED: u32 = 7;
const BIT_USABLE: u32 = 6;
const BIT_USER: u32 = 5;
const BIT_PHYSICAL: u32 = 4;
const BIT_PRESENT: u32 = 3;

impl Pte {
    /// Decodes a raw 32-bit word into a `Pte`.
    #[must_use]
    pub fn decode(word: u32) -> Self {
        let bit = |n: u32| (word >> n) & 1 != 0;
        Self {
            pfn: word >> PFN_SHIFT,
            execute: bit(BIT_EXECUTE),
            write: bit(BIT_WRITE),
            read: bit(BIT_READ),
            dirty: bit(BIT_DIRTY),
            accessed: bit(BIT_ACCESSED),
            usable: bit(BIT_USABLE),
            user: bit(BIT_USER),
            physical: bit(BIT_PHYSICAL),
            present: bit(BIT_PRESENT),
        }
    }

    /// Encodes this `Pte` back into its 32-bit word representation. The
    /// three reserved low bits are always zero.
    #[must_use]
    pub fn encode(self) -> u32 {
        let mut word = self.pfn << PFN_SHIFT;
        let mut set = |n: u32, v: bool| {
            if v {
                word |= 1 << n;
            }
        };
        set(BIT_EXECUTE, self.execute);
        set(BIT_WRITE, self.write);
        set(BIT_READ, self.read);
        set(BIT_DIRTY, self.dirty);
        set(BIT_ACCESSED, self.accessed);
        set(BIT_USABLE, self.usable);
        set(BIT_USER, self.user);
        set(BIT_PHYSICAL, self.physical);
        set(BIT_PRESENT, self.present);
        word
    }

    /// Physical base address of the frame this PTE names.
    #[must_use]
    pub fn frame_base(self) -> u32 {
        self.pfn << PFN_SHIFT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_bits() {
        let word: u32 = (0x1234_5 << 12) | 0b1111_1000;
        let pte = Pte::decode(word);
        assert_eq!(pte.encode(), word & !0b111);
    }

    #[test]
    fn superpage_bit_is_bit4() {
        let pte = Pte::decode(0b1_0000);
        assert!(pte.physical);
        assert!(!pte.present);
    }

    proptest::proptest! {
        /// decode(encode(w)) == w modulo the three reserved low bits, for
        /// every 32-bit word.
        #[test]
        fn round_trip_holds_for_any_word(word: u32) {
            let pte = Pte::decode(word);
            proptest::prop_assert_eq!(pte.encode(), word & !0b111);
        }
    }
}
