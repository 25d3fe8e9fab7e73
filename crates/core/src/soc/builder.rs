//! Assembles the bus, interrupt controller, and every device into one
//! [`System`], wiring each device's background thread to the shared
//! interrupt controller and the CPU's pending-interrupt line.
//!
//! Grounded in the teacher's system builder (`soc/builder.rs` before this
//! rework), which likewise owned the one-time construction of bus + device
//! set from a `Config`; narrowed here to this architecture's fixed MMIO
//! layout (§6 of the design notes) rather than a RISC-V devicetree walk.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::common::error::HostError;
use crate::soc::devices::{Keyboard, Net, Printer, Rtc, Storage, Timer};
use crate::soc::intc::{Intc, InterruptSink};
use crate::soc::traits::Device;
use crate::soc::Bus;

/// MMIO base address of the interrupt controller.
pub const INTC_BASE: u32 = 0xFFFF_E000;
/// MMIO base address of the printer.
pub const PRINTER_BASE: u32 = 0xFFFF_D000;
/// MMIO base address of the keyboard.
pub const KEYBOARD_BASE: u32 = 0xFFFF_D010;
/// MMIO base address of the timer.
pub const TIMER_BASE: u32 = 0xFFFF_D020;
/// MMIO base address of the real-time clock.
pub const RTC_BASE: u32 = 0xFFFF_D030;
/// MMIO base address of block storage.
pub const STORAGE_BASE: u32 = 0xFFFF_D100;
/// MMIO base address of the net adapter.
pub const NET_BASE: u32 = 0xFFFF_D400;

/// Interrupt number raised by the keyboard.
pub const IRQ_KEYBOARD: u32 = 1;
/// Interrupt number raised by the timer.
pub const IRQ_TIMER: u32 = 2;
/// Interrupt number raised by the net adapter's async readiness.
pub const IRQ_NET: u32 = 3;

/// A single `AtomicBool` shared between the interrupt controller's dispatch
/// worker and the CPU's fetch loop. The worker sets it once an unmasked
/// interrupt's vector is staged in `Intc`'s `current_vector` register; the
/// CPU clears it the moment it takes the interrupt trap (edge-triggered
/// consumption, not level-triggered).
#[derive(Clone, Default)]
pub struct InterruptLine {
    pending: Arc<AtomicBool>,
}

impl InterruptLine {
    /// Creates a line with no interrupt pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an interrupt is currently pending; does not clear it.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Clears the pending flag, returning whether it had been set. Called by
    /// the CPU exactly once per interrupt it takes.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }
}

impl InterruptSink for InterruptLine {
    fn intr(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }
}

/// The assembled machine: bus (RAM + trap aperture + devices) and the
/// interrupt controller, which is also attached to the bus as a device.
pub struct System {
    /// Physical address space.
    pub bus: Bus,
    /// Interrupt controller, kept separately so device constructors can
    /// clone its `Arc` before it's attached to the bus.
    pub intc: Arc<Intc>,
}

impl System {
    /// Builds a system with `ram_bytes` of RAM and every fixed MMIO device
    /// attached at its designated base address. `storage_path` backs the
    /// block storage device; it is created if absent.
    ///
    /// Returns the assembled system and the [`InterruptLine`] the CPU
    /// should poll before each fetch.
    ///
    /// # Errors
    ///
    /// `HostError::StorageFile` if the storage backing file can't be
    /// opened or sized.
    pub fn assemble(ram_bytes: u32, storage_path: &str) -> Result<(Self, InterruptLine), HostError> {
        let line = InterruptLine::new();
        let intc = Arc::new(Intc::new(line.clone()));

        let mut bus = Bus::new(ram_bytes);
        bus.attach(Box::new(Printer::new(PRINTER_BASE)));
        bus.attach(Box::new(Keyboard::new(
            KEYBOARD_BASE,
            Arc::clone(&intc),
            IRQ_KEYBOARD,
        )));
        bus.attach(Box::new(Timer::new(
            TIMER_BASE,
            Arc::clone(&intc),
            IRQ_TIMER,
        )));
        bus.attach(Box::new(Rtc::new(RTC_BASE)));
        bus.attach(Box::new(Storage::new(STORAGE_BASE, storage_path)?));
        bus.attach(Box::new(Net::new(NET_BASE, Arc::clone(&intc), IRQ_NET)));

        bus.attach(Box::new(IntcHandle(Arc::clone(&intc))));

        Ok((Self { bus, intc }, line))
    }
}

/// `Intc` is attached to the bus as a `Device` alongside being held as an
/// `Arc` by every device that raises interrupts. Since `Device::read_u8`
/// etc. take `&self` and `Intc`'s own state is behind its internal
/// `Mutex`, a thin forwarding wrapper lets both owners share the same
/// instance without cloning its state.
struct IntcHandle(Arc<Intc>);

impl Device for IntcHandle {
    fn name(&self) -> &str {
        self.0.name()
    }
    fn address_range(&self) -> (u32, u32) {
        self.0.address_range()
    }
    fn read_u8(&self, offset: u32) -> u8 {
        self.0.read_u8(offset)
    }
    fn write_u8(&self, offset: u32, val: u8) {
        self.0.write_u8(offset, val);
    }
    fn read_u32(&self, offset: u32) -> u32 {
        self.0.read_u32(offset)
    }
    fn write_u32(&self, offset: u32, val: u32) {
        self.0.write_u32(offset, val);
    }
}
