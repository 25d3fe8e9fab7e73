//! Device trait for memory-mapped I/O.
//!
//! Bus-attached devices expose a name, a 32-bit address range, and
//! byte-granular read/write. Devices keep their mutable state behind an
//! internal `Mutex` rather than taking `&mut self`, because several devices
//! are also touched by their own background thread (timer tick, keyboard
//! scan) concurrently with the CPU thread driving bus accesses.

/// A memory-mapped device attached to the system bus.
pub trait Device: Send + Sync {
    /// Short name for diagnostics (e.g. `"timer"`, `"storage"`).
    fn name(&self) -> &str;

    /// `(base_address, size_in_bytes)` of this device's MMIO window.
    fn address_range(&self) -> (u32, u32);

    /// Reads one byte at the given device-relative offset.
    fn read_u8(&self, offset: u32) -> u8;

    /// Writes one byte at the given device-relative offset.
    fn write_u8(&self, offset: u32, val: u8);

    /// Reads a 32-bit big-endian word at the given offset. Default
    /// composes four `read_u8` calls; devices with natively word-sized
    /// registers may override for efficiency.
    fn read_u32(&self, offset: u32) -> u32 {
        (u32::from(self.read_u8(offset)) << 24)
            | (u32::from(self.read_u8(offset + 1)) << 16)
            | (u32::from(self.read_u8(offset + 2)) << 8)
            | u32::from(self.read_u8(offset + 3))
    }

    /// Writes a 32-bit big-endian word at the given offset.
    fn write_u32(&self, offset: u32, val: u32) {
        self.write_u8(offset, (val >> 24) as u8);
        self.write_u8(offset + 1, (val >> 16) as u8);
        self.write_u8(offset + 2, (val >> 8) as u8);
        self.write_u8(offset + 3, val as u8);
    }

    /// Copies a byte slice into the device starting at `offset`, used by
    /// the loader when an image overlaps a device's MMIO window (rare, but
    /// mirrors the bus's blob-load helper).
    fn write_bytes(&self, offset: u32, data: &[u8]) {
        for (i, byte) in data.iter().enumerate() {
            self.write_u8(offset + i as u32, *byte);
        }
    }
}
