//! Flat binary image loading.
//!
//! Unlike the teacher's RISC-V boot sequence (OpenSBI + kernel + DTB at
//! fixed offsets), this architecture has no firmware handoff: the image is
//! one flat binary of 16-byte instructions, loaded at physical address 0,
//! with `PC` starting at 0.

use std::fs;

use crate::common::error::HostError;
use crate::soc::System;

/// Reads `path` from disk and loads it into `system`'s RAM at address 0.
///
/// # Errors
///
/// `HostError::ImageNotFound` if the file can't be read, or
/// `HostError::ImageTooLarge` if it doesn't fit in the configured RAM.
pub fn load_image(system: &mut System, path: &str, ram_bytes: u32) -> Result<(), HostError> {
    let image = fs::read(path).map_err(|source| HostError::ImageNotFound {
        path: path.to_string(),
        source,
    })?;

    if image.len() > ram_bytes as usize {
        return Err(HostError::ImageTooLarge {
            image_len: image.len(),
            ram_bytes,
        });
    }

    system.bus.load_image(&image);
    Ok(())
}
