//! System-on-chip assembly: the physical bus, the interrupt controller, and
//! every MMIO device, wired together into one [`System`].

/// System bus: RAM, trap-vector aperture, and device dispatch.
pub mod bus;

/// System builder: assembles [`System`] from a [`crate::config::Config`].
pub mod builder;

/// Memory-mapped I/O device implementations.
pub mod devices;

/// Interrupt controller.
pub mod intc;

/// Device trait definitions for MMIO access.
pub mod traits;

pub use bus::Bus;
pub use builder::{InterruptLine, System};
pub use intc::Intc;
pub use traits::Device;
