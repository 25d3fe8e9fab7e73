//! Memory-mapped I/O devices.
//!
//! Each device owns its mutable state behind an internal `Mutex` (or a bare
//! atomic where one suffices) rather than requiring `&mut self`, because
//! several of them run a background thread of their own — alongside the CPU
//! thread driving bus accesses — and raise interrupts asynchronously.

/// Character printer, one byte wide.
pub mod printer;

/// Line-buffered keyboard fed by a stdin-reading thread.
pub mod keyboard;

/// Millisecond interval timer.
pub mod timer;

/// Real-time clock with a one-shot resample latch.
pub mod rtc;

/// Host-file-backed block storage.
pub mod storage;

/// Socket adapter: command register bank over host TCP/UDP sockets.
pub mod net;

pub use keyboard::Keyboard;
pub use net::Net;
pub use printer::Printer;
pub use rtc::Rtc;
pub use storage::Storage;
pub use timer::Timer;

pub use crate::soc::traits::Device;
