//! Processor status register
//!
//! The status word holds the current and previous privilege mode and the
//! current and previous interrupt-enable state. Any other bit set makes the
//! word invalid, and the processor refuses to load it.

use std::fmt;
use thiserror::Error;

/// Set when the processor runs in kernel mode
pub const PSR_CURRENT_MODE: u32 = 0x1;
/// Set when interrupts are enabled
pub const PSR_CURRENT_INT: u32 = 0x2;
/// Mode saved on the last interrupt
pub const PSR_PREV_MODE: u32 = 0x4;
/// Interrupt state saved on the last interrupt
pub const PSR_PREV_INT: u32 = 0x8;

const PSR_VALID_MASK: u32 = PSR_CURRENT_MODE | PSR_CURRENT_INT | PSR_PREV_MODE | PSR_PREV_INT;

/// Error returned when loading a status word the processor does not accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PsrError {
    #[error("invalid processor status word {0:#x}")]
    Invalid(u32),
}

/// A processor status word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Psr(u32);

impl Psr {
    /// Status after reset: kernel mode, interrupts enabled
    pub const BOOT: Psr = Psr(PSR_CURRENT_MODE | PSR_CURRENT_INT);

    /// User mode with interrupts enabled
    pub const USER: Psr = Psr(PSR_CURRENT_INT);

    /// Wraps a raw status word without validating it
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw status word
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Returns whether the word only uses defined bits
    pub fn is_valid(&self) -> bool {
        self.0 & !PSR_VALID_MASK == 0
    }

    /// Validates the word, returning it unchanged when it is loadable
    pub fn validate(self) -> Result<Self, PsrError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(PsrError::Invalid(self.0))
        }
    }

    pub fn is_kernel_mode(&self) -> bool {
        self.0 & PSR_CURRENT_MODE != 0
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.0 & PSR_CURRENT_INT != 0
    }

    /// Returns a copy with the interrupt-enable bit set or cleared
    pub fn with_interrupts(self, enabled: bool) -> Self {
        if enabled {
            Self(self.0 | PSR_CURRENT_INT)
        } else {
            Self(self.0 & !PSR_CURRENT_INT)
        }
    }

    /// Returns a copy with the kernel-mode bit set or cleared
    pub fn with_kernel_mode(self, kernel: bool) -> Self {
        if kernel {
            Self(self.0 | PSR_CURRENT_MODE)
        } else {
            Self(self.0 & !PSR_CURRENT_MODE)
        }
    }
}

impl fmt::Display for Psr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Psr({:#x}, {}, interrupts {})",
            self.0,
            if self.is_kernel_mode() { "kernel" } else { "user" },
            if self.interrupts_enabled() { "on" } else { "off" }
        )
    }
}
