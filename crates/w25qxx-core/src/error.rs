//! Error types for w25qxx-core
//!
//! A single no_std compatible error type shared by the whole crate.
//! Failures that are detected before a bus exchange (parameter
//! validation, state checks) are guaranteed to leave the chip untouched.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Underlying bus transfer failed
    Transport,
    /// Handle has not been initialized yet
    NotInitialized,
    /// Operation is not legal in the current lifecycle state
    InvalidState,
    /// Requested operation is incompatible with the current interface,
    /// address mode or quad-enable state
    ModeMismatch,
    /// A mode-change status write did not read back with the expected value
    ModeTransitionFailed,
    /// Page program payload would wrap within the 256-byte page
    PageBoundaryCrossed {
        /// Start address of the rejected program
        addr: u32,
        /// Payload length
        len: u32,
    },
    /// Address does not resolve to a valid location for the configured chip
    AddressOutOfRange {
        /// The offending address
        addr: u32,
    },
    /// Address is not aligned to the erase granularity
    InvalidAlignment,
    /// Probed chip ID does not match the configured chip type
    IdMismatch {
        /// ID word the configured type answers to
        expected: u16,
        /// ID word read from the chip
        found: u16,
    },
    /// Busy-poll exceeded the configured bound
    Timeout,
    /// Suspend requested while no erase/program is in progress
    NothingToSuspend,
    /// Resume requested while no operation is suspended
    NothingToResume,
    /// Operation is not available for the configured chip type
    UnsupportedOperation,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "bus transfer failed"),
            Self::NotInitialized => write!(f, "handle not initialized"),
            Self::InvalidState => write!(f, "operation not valid in current state"),
            Self::ModeMismatch => {
                write!(f, "operation incompatible with current interface/mode")
            }
            Self::ModeTransitionFailed => {
                write!(f, "mode transition did not read back as expected")
            }
            Self::PageBoundaryCrossed { addr, len } => {
                write!(
                    f,
                    "program of {} bytes at 0x{:08X} crosses a page boundary",
                    len, addr
                )
            }
            Self::AddressOutOfRange { addr } => {
                write!(f, "address 0x{:08X} out of range for chip", addr)
            }
            Self::InvalidAlignment => write!(f, "address not aligned to erase block"),
            Self::IdMismatch { expected, found } => {
                write!(
                    f,
                    "chip ID mismatch: expected 0x{:04X}, found 0x{:04X}",
                    expected, found
                )
            }
            Self::Timeout => write!(f, "busy-poll timed out"),
            Self::NothingToSuspend => write!(f, "no erase/program in progress to suspend"),
            Self::NothingToResume => write!(f, "no suspended operation to resume"),
            Self::UnsupportedOperation => {
                write!(f, "operation not supported by configured chip type")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
