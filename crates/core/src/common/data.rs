//! Memory access permission types.
//!
//! The MMU checks a required permission mask against a PTE's R/W/X bits on
//! every translated access. Read is implicitly required on every access, so
//! it is tracked alongside write/execute rather than being its own
//! independent request.

/// A permission mask requested of the MMU for one memory access.
///
/// `read` is always `true` in practice (every access implicitly requires
/// read permission, per the data model); `write` and `execute` are set
/// according to whether the access is a store or an instruction fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AccessMask {
    /// Read permission requested.
    pub read: bool,
    /// Write permission requested.
    pub write: bool,
    /// Execute permission requested.
    pub execute: bool,
}

impl AccessMask {
    /// Mask for a data load: read only.
    pub const READ: Self = Self {
        read: true,
        write: false,
        execute: false,
    };
    /// Mask for a data store: read and write (the PTE must allow both, since
    /// a store also validates the destination is mapped for read).
    pub const WRITE: Self = Self {
        read: true,
        write: true,
        execute: false,
    };
    /// Mask for an instruction fetch: read and execute.
    pub const EXECUTE: Self = Self {
        read: true,
        write: false,
        execute: true,
    };

    /// Whether this mask is satisfied by the given PTE permission bits.
    #[must_use]
    pub fn satisfied_by(self, read: bool, write: bool, execute: bool) -> bool {
        (!self.read || read) && (!self.write || write) && (!self.execute || execute)
    }
}
