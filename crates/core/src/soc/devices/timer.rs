//! Timer device: a 4-byte duration register in milliseconds; a background
//! thread sleeps that long, raises its interrupt, and repeats, re-reading
//! the duration each cycle so a guest write takes effect on the next tick.
//!
//! Grounded in `original_source/compyter/hardware/timer.py`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::soc::intc::Intc;
use crate::soc::traits::Device;

/// Timer MMIO window plus its background sleep-loop thread.
pub struct Timer {
    base: u32,
    duration_ms: Arc<AtomicU32>,
    generation: Arc<AtomicU32>,
    worker: Option<JoinHandle<()>>,
}

impl Timer {
    /// Creates a timer at `base` raising interrupt number `irq` every
    /// `duration_ms` milliseconds; a duration of 0 parks the thread without
    /// firing (matches the original's "timer disabled" idiom of writing 0).
    pub fn new(base: u32, intc: Arc<Intc>, irq: u32) -> Self {
        let duration_ms = Arc::new(AtomicU32::new(0));
        let generation = Arc::new(AtomicU32::new(0));
        let worker_duration = Arc::clone(&duration_ms);
        let worker_generation = Arc::clone(&generation);
        let want_generation = 0;
        let worker = thread::Builder::new()
            .name("timer".into())
            .spawn(move || loop {
                if worker_generation.load(Ordering::SeqCst) != want_generation {
                    return;
                }
                let ms = worker_duration.load(Ordering::SeqCst);
                if ms == 0 {
                    thread::sleep(Duration::from_millis(10));
                    continue;
                }
                thread::sleep(Duration::from_millis(u64::from(ms)));
                if worker_generation.load(Ordering::SeqCst) != want_generation {
                    return;
                }
                intc.interrupt(irq);
            })
            .expect("failed to spawn timer thread");
        Self {
            base,
            duration_ms,
            generation,
            worker: Some(worker),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Device for Timer {
    fn name(&self) -> &str {
        "timer"
    }

    fn address_range(&self) -> (u32, u32) {
        (self.base, 4)
    }

    fn read_u8(&self, offset: u32) -> u8 {
        let ms = self.duration_ms.load(Ordering::SeqCst);
        let shift = 24 - (offset % 4) * 8;
        (ms >> shift) as u8
    }

    fn write_u32(&self, offset: u32, val: u32) {
        if offset == 0 {
            self.duration_ms.store(val, Ordering::SeqCst);
        }
    }

    fn write_u8(&self, offset: u32, val: u8) {
        let shift = 24 - (offset % 4) * 8;
        let mask = !(0xFFu32 << shift);
        let prev = self.duration_ms.load(Ordering::SeqCst);
        let next = (prev & mask) | (u32::from(val) << shift);
        self.duration_ms.store(next, Ordering::SeqCst);
    }
}
