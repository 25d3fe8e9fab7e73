//! Keyboard device: enable flag plus last-character register, fed by a
//! background thread blocked on host stdin.
//!
//! Grounded in `original_source/compyter/hardware/keyboard.py`.

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::soc::intc::Intc;
use crate::soc::traits::Device;

const REG_ENABLE: u32 = 0x00;
const REG_CHAR: u32 = 0x04;

struct Shared {
    enabled: bool,
    last_char: u32,
}

/// Keyboard MMIO window plus its background stdin reader.
pub struct Keyboard {
    base: u32,
    shared: Arc<Mutex<Shared>>,
    worker: Option<JoinHandle<()>>,
}

impl Keyboard {
    /// Creates a keyboard device and spawns its stdin-reading thread. `irq`
    /// is the interrupt number it raises for each character while enabled.
    pub fn new(base: u32, intc: Arc<Intc>, irq: u32) -> Self {
        let shared = Arc::new(Mutex::new(Shared {
            enabled: false,
            last_char: 0,
        }));
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("keyboard".into())
            .spawn(move || {
                let mut byte = [0u8; 1];
                loop {
                    match std::io::stdin().read(&mut byte) {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            let enabled = {
                                let mut guard = worker_shared.lock().expect("keyboard lock poisoned");
                                guard.last_char = u32::from(byte[0]);
                                guard.enabled
                            };
                            if enabled {
                                intc.interrupt(irq);
                            }
                        }
                    }
                }
            })
            .expect("failed to spawn keyboard thread");
        Self {
            base,
            shared,
            worker: Some(worker),
        }
    }
}

impl Drop for Keyboard {
    fn drop(&mut self) {
        // The stdin-reading thread blocks indefinitely; we don't join it on
        // shutdown since the process is exiting anyway (matches the
        // original's daemon-thread behavior).
        self.worker.take();
    }
}

impl Device for Keyboard {
    fn name(&self) -> &str {
        "keyboard"
    }

    fn address_range(&self) -> (u32, u32) {
        (self.base, 8)
    }

    fn read_u8(&self, offset: u32) -> u8 {
        let guard = self.shared.lock().expect("keyboard lock poisoned");
        match offset {
            REG_ENABLE => u8::from(guard.enabled),
            REG_CHAR..=0x07 => {
                let shift = 24 - (offset - REG_CHAR) * 8;
                (guard.last_char >> shift) as u8
            }
            _ => 0,
        }
    }

    fn write_u8(&self, offset: u32, val: u8) {
        if offset == REG_ENABLE {
            let mut guard = self.shared.lock().expect("keyboard lock poisoned");
            guard.enabled = val != 0;
        }
    }
}
