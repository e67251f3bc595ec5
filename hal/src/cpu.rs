//! CPU abstraction

use crate::psr::{Psr, PsrError};
use core_types::ProcessId;
use thiserror::Error;

/// Why the machine was halted
///
/// Every variant is a broken invariant in calling code. None of them is
/// returned to a caller; they are only ever handed to
/// [`ProcessorHal::halt`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HaltReason {
    /// A kernel operation was invoked outside kernel mode
    #[error("{operation}(): called while in user mode")]
    ModeViolation { operation: String },

    /// A kernel table was found in an impossible state
    #[error("{operation}(): illegal state: {detail}")]
    IllegalState { operation: String, detail: String },

    /// A process block descriptor was initialized while still live
    #[error("block table entry for {pid} still holds live {occupant}")]
    BlockEntryInUse { pid: ProcessId, occupant: ProcessId },

    /// A device type code that does not name any device
    #[error("device type {device_type} does not correspond to any device")]
    UnknownDevice { device_type: u32 },

    /// A unit number beyond the device's unit count
    #[error("unit number {unit} is invalid for device type {device_type}")]
    InvalidUnit { device_type: u32, unit: u32 },

    /// A system call number with no handler
    #[error("invalid syscall {number}")]
    InvalidSyscall { number: u32 },
}

/// CPU-specific operations
///
/// This trait abstracts the processor status register and the halt
/// instruction. It is shared between every simulated process and every
/// interrupt handler, hence `Send + Sync`.
pub trait ProcessorHal: Send + Sync {
    /// Reads the current processor status word
    fn psr(&self) -> Psr;

    /// Loads a new processor status word
    ///
    /// # Errors
    ///
    /// Returns [`PsrError::Invalid`] if the word sets undefined bits. The
    /// register is left unchanged in that case.
    fn set_psr(&self, psr: Psr) -> Result<(), PsrError>;

    /// Stops the whole machine
    fn halt(&self, reason: HaltReason) -> !;
}
