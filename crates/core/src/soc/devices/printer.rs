//! Printer device: one byte, written straight to stdout.
//!
//! Grounded in `original_source/compyter/hardware/printer.py`.

use std::io::Write;
use std::sync::Mutex;

use crate::soc::traits::Device;

/// 1-byte MMIO printer.
pub struct Printer {
    base: u32,
    last: Mutex<u8>,
}

impl Printer {
    /// Creates a printer at the given MMIO base address.
    #[must_use]
    pub fn new(base: u32) -> Self {
        Self {
            base,
            last: Mutex::new(0),
        }
    }
}

impl Device for Printer {
    fn name(&self) -> &str {
        "printer"
    }

    fn address_range(&self) -> (u32, u32) {
        (self.base, 1)
    }

    fn read_u8(&self, _offset: u32) -> u8 {
        *self.last.lock().expect("printer lock poisoned")
    }

    fn write_u8(&self, _offset: u32, val: u8) {
        *self.last.lock().expect("printer lock poisoned") = val;
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(&[val]);
        let _ = stdout.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_range_is_one_byte() {
        let printer = Printer::new(0xFFFF_D000);
        assert_eq!(printer.address_range(), (0xFFFF_D000, 1));
    }
}
