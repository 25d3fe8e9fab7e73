//! Block storage: a 4-byte offset register, a 4-byte write-enable gate, a
//! read-only 4-byte size register, and a 512-byte window mapped onto a
//! host-backed file at `offset + window_offset`.
//!
//! Grounded in `original_source/compyter/hardware/storage.py`.

use std::fs::File;
use std::io::{Read as _, Seek, SeekFrom, Write as _};
use std::sync::Mutex;

use crate::common::error::HostError;
use crate::soc::traits::Device;

const REG_OFFSET: u32 = 0x00;
const REG_WRITE_ENABLE: u32 = 0x04;
const REG_SIZE: u32 = 0x08;
const WINDOW_BASE: u32 = 0x0C;
const WINDOW_LEN: u32 = 512;

struct State {
    file: File,
    size: u32,
    offset: u32,
    write_enable: bool,
}

/// Storage MMIO window over a host-backed file.
pub struct Storage {
    base: u32,
    state: Mutex<State>,
}

impl Storage {
    /// Opens (creating if absent) the backing file at `path` and attaches it
    /// at `base`.
    ///
    /// # Errors
    ///
    /// `HostError::StorageFile` if the file can't be opened or its length
    /// can't be queried.
    pub fn new(base: u32, path: &str) -> Result<Self, HostError> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(|source| HostError::StorageFile {
                path: path.to_string(),
                source,
            })?;
        let size = file
            .metadata()
            .map_err(|source| HostError::StorageFile {
                path: path.to_string(),
                source,
            })?
            .len() as u32;
        Ok(Self {
            base,
            state: Mutex::new(State {
                file,
                size,
                offset: 0,
                write_enable: false,
            }),
        })
    }
}

impl Device for Storage {
    fn name(&self) -> &str {
        "storage"
    }

    fn address_range(&self) -> (u32, u32) {
        (self.base, WINDOW_BASE + WINDOW_LEN)
    }

    fn read_u8(&self, offset: u32) -> u8 {
        let mut guard = self.state.lock().expect("storage lock poisoned");
        match offset {
            REG_OFFSET..=0x03 => {
                let shift = 24 - offset * 8;
                (guard.offset >> shift) as u8
            }
            REG_WRITE_ENABLE..=0x07 => {
                let shift = 24 - (offset - REG_WRITE_ENABLE) * 8;
                (u32::from(guard.write_enable) >> shift) as u8
            }
            REG_SIZE..=0x0B => {
                let shift = 24 - (offset - REG_SIZE) * 8;
                (guard.size >> shift) as u8
            }
            w if w >= WINDOW_BASE && w < WINDOW_BASE + WINDOW_LEN => {
                let file_offset = u64::from(guard.offset) + u64::from(w - WINDOW_BASE);
                let mut byte = [0u8; 1];
                if guard.file.seek(SeekFrom::Start(file_offset)).is_ok()
                    && guard.file.read_exact(&mut byte).is_ok()
                {
                    byte[0]
                } else {
                    0
                }
            }
            _ => 0,
        }
    }

    fn write_u8(&self, offset: u32, val: u8) {
        let mut guard = self.state.lock().expect("storage lock poisoned");
        match offset {
            REG_OFFSET..=0x03 => {
                let shift = 24 - offset * 8;
                let mask = !(0xFFu32 << shift);
                guard.offset = (guard.offset & mask) | (u32::from(val) << shift);
            }
            REG_WRITE_ENABLE..=0x07 => {
                guard.write_enable = val != 0;
            }
            w if w >= WINDOW_BASE && w < WINDOW_BASE + WINDOW_LEN => {
                if !guard.write_enable {
                    return;
                }
                let file_offset = u64::from(guard.offset) + u64::from(w - WINDOW_BASE);
                if guard.file.seek(SeekFrom::Start(file_offset)).is_ok() {
                    let _ = guard.file.write_all(&[val]);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn write_ignored_without_write_enable() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let storage = Storage::new(0xFFFF_D100, file.path().to_str().unwrap()).unwrap();
        storage.write_u8(WINDOW_BASE, 0xAB);
        assert_eq!(storage.read_u8(WINDOW_BASE), 0);
        storage.write_u8(REG_WRITE_ENABLE + 3, 1);
        storage.write_u8(WINDOW_BASE, 0xAB);
        assert_eq!(storage.read_u8(WINDOW_BASE), 0xAB);
    }

    #[test]
    fn offset_register_relocates_the_window_onto_the_backing_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let storage = Storage::new(0xFFFF_D100, file.path().to_str().unwrap()).unwrap();
        storage.write_u8(REG_WRITE_ENABLE + 3, 1);
        storage.write_u32(REG_OFFSET, 100);
        storage.write_u8(WINDOW_BASE, 0x42);
        storage.write_u32(REG_OFFSET, 0);
        assert_eq!(storage.read_u8(WINDOW_BASE), 0);
    }
}
