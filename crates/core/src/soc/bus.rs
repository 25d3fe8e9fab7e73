//! System bus: RAM, the trap-vector aperture, and the sorted MMIO device
//! table, unified behind one byte-addressed 32-bit physical address space.
//!
//! Grounded in the teacher's sorted-range device lookup (`interconnect.rs`
//! in the original RISC-V tree); narrowed to this architecture's flat,
//! MMU-agnostic physical space (there is no separate "memory map" concept
//! here, since RAM starts at physical address 0 and everything above it is
//! either a device or the trap aperture).

use crate::common::constants::{TRAP_APERTURE_BASE, TRAP_APERTURE_SIZE};
use crate::core::mmu::PhysMem;
use crate::soc::traits::Device;

/// A device's registered MMIO window: its base, size, and handle.
struct Mapping {
    base: u32,
    size: u32,
    device: Box<dyn Device>,
}

/// The system's physical address space: RAM at `[0, ram.len())`, a fixed
/// 4 KiB trap-vector aperture at `TRAP_APERTURE_BASE`, and any number of
/// non-overlapping MMIO device windows above RAM.
pub struct Bus {
    ram: Vec<u8>,
    trap_vectors: [u8; TRAP_APERTURE_SIZE as usize],
    devices: Vec<Mapping>,
}

/// Where a physical address falls.
enum Target<'a> {
    Ram,
    TrapAperture,
    Device(&'a Mapping),
    Unmapped,
}

impl Bus {
    /// Creates a bus with `ram_bytes` of zeroed RAM and no devices attached
    /// yet; call [`Bus::attach`] to register each device.
    #[must_use]
    pub fn new(ram_bytes: u32) -> Self {
        Self {
            ram: vec![0; ram_bytes as usize],
            trap_vectors: [0; TRAP_APERTURE_SIZE as usize],
            devices: Vec::new(),
        }
    }

    /// Registers a device at its own declared `(base, size)` window.
    pub fn attach(&mut self, device: Box<dyn Device>) {
        let (base, size) = device.address_range();
        self.devices.push(Mapping { base, size, device });
        self.devices.sort_by_key(|m| m.base);
    }

    /// Loads a flat binary image into RAM starting at physical address 0.
    ///
    /// # Panics
    ///
    /// Panics if `image` is longer than the configured RAM; callers are
    /// expected to have already validated this against `HostError::ImageTooLarge`.
    pub fn load_image(&mut self, image: &[u8]) {
        self.ram[..image.len()].copy_from_slice(image);
    }

    fn locate(&self, addr: u32) -> Target<'_> {
        if (addr as usize) < self.ram.len() {
            return Target::Ram;
        }
        if addr >= TRAP_APERTURE_BASE
            && addr < TRAP_APERTURE_BASE.saturating_add(TRAP_APERTURE_SIZE)
        {
            return Target::TrapAperture;
        }
        for mapping in &self.devices {
            if addr >= mapping.base && addr < mapping.base.saturating_add(mapping.size) {
                return Target::Device(mapping);
            }
        }
        Target::Unmapped
    }

    /// Reads one byte. Unmapped addresses read as zero.
    #[must_use]
    pub fn read_u8(&self, addr: u32) -> u8 {
        match self.locate(addr) {
            Target::Ram => self.ram[addr as usize],
            Target::TrapAperture => self.trap_vectors[(addr - TRAP_APERTURE_BASE) as usize],
            Target::Device(mapping) => mapping.device.read_u8(addr - mapping.base),
            Target::Unmapped => 0,
        }
    }

    /// Writes one byte. Unmapped addresses are silently dropped.
    pub fn write_u8(&mut self, addr: u32, val: u8) {
        if (addr as usize) < self.ram.len() {
            self.ram[addr as usize] = val;
            return;
        }
        if addr >= TRAP_APERTURE_BASE && addr < TRAP_APERTURE_BASE.saturating_add(TRAP_APERTURE_SIZE)
        {
            self.trap_vectors[(addr - TRAP_APERTURE_BASE) as usize] = val;
            return;
        }
        if let Some(mapping) = self
            .devices
            .iter()
            .find(|m| addr >= m.base && addr < m.base.saturating_add(m.size))
        {
            mapping.device.write_u8(addr - mapping.base, val);
        }
    }

    /// Reads a 32-bit big-endian word.
    #[must_use]
    pub fn read_u32(&self, addr: u32) -> u32 {
        match self.locate(addr) {
            Target::Device(mapping) => mapping.device.read_u32(addr - mapping.base),
            _ => {
                (u32::from(self.read_u8(addr)) << 24)
                    | (u32::from(self.read_u8(addr.wrapping_add(1))) << 16)
                    | (u32::from(self.read_u8(addr.wrapping_add(2))) << 8)
                    | u32::from(self.read_u8(addr.wrapping_add(3)))
            }
        }
    }

    /// Writes a 32-bit big-endian word.
    pub fn write_u32(&mut self, addr: u32, val: u32) {
        if let Some(mapping) = self
            .devices
            .iter()
            .find(|m| addr >= m.base && addr < m.base.saturating_add(m.size))
        {
            mapping.device.write_u32(addr - mapping.base, val);
            return;
        }
        self.write_u8(addr, (val >> 24) as u8);
        self.write_u8(addr.wrapping_add(1), (val >> 16) as u8);
        self.write_u8(addr.wrapping_add(2), (val >> 8) as u8);
        self.write_u8(addr.wrapping_add(3), val as u8);
    }
}

impl PhysMem for Bus {
    fn read_phys_u32(&mut self, addr: u32) -> u32 {
        Bus::read_u32(self, addr)
    }

    fn write_phys_u32(&mut self, addr: u32, val: u32) {
        Bus::write_u32(self, addr, val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub {
        base: u32,
        size: u32,
    }

    impl Device for Stub {
        fn name(&self) -> &str {
            "stub"
        }
        fn address_range(&self) -> (u32, u32) {
            (self.base, self.size)
        }
        fn read_u8(&self, offset: u32) -> u8 {
            offset as u8
        }
        fn write_u8(&self, _offset: u32, _val: u8) {}
    }

    #[test]
    fn ram_reads_and_writes_round_trip() {
        let mut bus = Bus::new(64);
        bus.write_u32(0, 0xDEAD_BEEF);
        assert_eq!(bus.read_u32(0), 0xDEAD_BEEF);
    }

    #[test]
    fn trap_aperture_is_independent_of_ram() {
        let mut bus = Bus::new(64);
        bus.write_u8(TRAP_APERTURE_BASE, 0x19);
        assert_eq!(bus.read_u8(TRAP_APERTURE_BASE), 0x19);
        assert_eq!(bus.read_u8(0), 0);
    }

    #[test]
    fn device_window_routes_relative_offset() {
        let mut bus = Bus::new(16);
        bus.attach(Box::new(Stub { base: 0x1000, size: 8 }));
        assert_eq!(bus.read_u8(0x1003), 3);
    }

    #[test]
    fn unmapped_address_reads_zero() {
        let bus = Bus::new(16);
        assert_eq!(bus.read_u8(0x5000), 0);
    }
}
