//! Trap definitions.
//!
//! Traps are the only channel through which guest-visible failures travel;
//! there is no guest-visible error taxonomy beyond the five kinds listed
//! below (see the crate's trap/privilege state machine documentation for the
//! full protocol).

use std::fmt;

/// Reasons execution of a single instruction can trap.
///
/// Four of these are retriable: the offending instruction is retried after
/// the handler returns because the program counter is rewound before the
/// trap is raised. `IllegalInstruction` is not retriable: the fetch already
/// advanced the program counter past the bad instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trap {
    /// Unknown opcode, out-of-range register operand, a reference to the
    /// reserved scratch register, or a privileged-register access from user
    /// mode.
    IllegalInstruction,
    /// `div`/`mod` with a zero divisor.
    DivisionByZero,
    /// MMU permission check failed, or a user-mode access targeted a
    /// kernel-only page.
    PageFault,
    /// `BASEPTR + 4096` would overflow the 32-bit address space.
    BadBasePointer,
    /// A trap occurred while FC was already 2 (trapped while already
    /// trapped); forced onto the double-fault vector.
    DoubleFault,
}

impl Trap {
    /// The trap vector this kind of trap is delivered through.
    #[must_use]
    pub fn vector(self) -> u32 {
        use crate::common::constants::{
            VEC_BAD_BASEPTR, VEC_DIVISION, VEC_DOUBLE_FAULT, VEC_ILLEGAL, VEC_PAGE_FAULT,
        };
        match self {
            Trap::IllegalInstruction => VEC_ILLEGAL,
            Trap::DivisionByZero => VEC_DIVISION,
            Trap::PageFault => VEC_PAGE_FAULT,
            Trap::BadBasePointer => VEC_BAD_BASEPTR,
            Trap::DoubleFault => VEC_DOUBLE_FAULT,
        }
    }

    /// Whether the faulting instruction's program counter should be rewound
    /// by one instruction width before the trap handler runs.
    #[must_use]
    pub fn rewinds_pc(self) -> bool {
        !matches!(self, Trap::IllegalInstruction)
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trap::IllegalInstruction => "illegal instruction",
            Trap::DivisionByZero => "division by zero",
            Trap::PageFault => "page fault",
            Trap::BadBasePointer => "bad base pointer",
            Trap::DoubleFault => "double fault",
        };
        f.write_str(name)
    }
}

impl std::error::Error for Trap {}

/// Host-level failures: conditions the guest never observes because they
/// happen before or outside guest execution (image loading, configuration,
/// device backing-file setup). These terminate the process with a
/// diagnostic rather than being delivered as traps.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The image file named on the command line could not be read.
    #[error("could not read image file {path}: {source}")]
    ImageNotFound {
        /// Path that was attempted.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The image file is larger than configured RAM.
    #[error("image is {image_len} bytes, larger than {ram_bytes} bytes of RAM")]
    ImageTooLarge {
        /// Size of the image file in bytes.
        image_len: usize,
        /// Configured RAM size in bytes.
        ram_bytes: u32,
    },

    /// The storage device's backing file could not be opened or sized.
    #[error("could not prepare storage backing file {path}: {source}")]
    StorageFile {
        /// Path to the backing file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file failed to parse.
    #[error("could not parse configuration file {path}: {source}")]
    Config {
        /// Path to the configuration file.
        path: String,
        /// Underlying parse error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
