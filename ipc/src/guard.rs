//! Kernel-mode checks and interrupt-masked critical sections
//!
//! Every mutation of the mailbox tables happens inside a
//! [`CriticalSection`]: the table lock is held and the processor's
//! interrupt-enable bit is cleared. Dropping the section restores the bit
//! to what it was on entry, so a section entered with interrupts already
//! off leaves them off.

use hal::{HaltReason, ProcessorHal};
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Halts the machine unless the processor is in kernel mode
pub fn require_kernel_mode(processor: &dyn ProcessorHal, operation: &str) {
    if !processor.psr().is_kernel_mode() {
        log::error!("{}(): called while in user mode", operation);
        processor.halt(HaltReason::ModeViolation {
            operation: operation.to_string(),
        });
    }
}

/// Manipulates the interrupt-enable bit of the processor status word
#[derive(Clone)]
pub struct InterruptMask {
    processor: Arc<dyn ProcessorHal>,
    debug: bool,
}

impl InterruptMask {
    pub fn new(processor: Arc<dyn ProcessorHal>, debug: bool) -> Self {
        Self { processor, debug }
    }

    /// Clears the interrupt bit, returning whether it was set
    ///
    /// Halts the machine if called from user mode.
    pub fn disable(&self) -> bool {
        require_kernel_mode(self.processor.as_ref(), "disable_interrupts");
        self.set_enabled(false)
    }

    /// Sets the interrupt bit
    ///
    /// Halts the machine if called from user mode.
    pub fn enable(&self) {
        require_kernel_mode(self.processor.as_ref(), "enable_interrupts");
        self.set_enabled(true);
    }

    /// Puts the interrupt bit back to a value returned by [`disable`](Self::disable)
    ///
    /// Halts the machine if called from user mode.
    pub fn restore(&self, enabled: bool) {
        require_kernel_mode(self.processor.as_ref(), "restore_interrupts");
        self.set_enabled(enabled);
    }

    fn set_enabled(&self, enabled: bool) -> bool {
        let psr = self.processor.psr();
        self.load(psr.with_interrupts(enabled));
        psr.interrupts_enabled()
    }

    fn load(&self, psr: hal::Psr) {
        // The new word only differs in a defined bit, so the processor
        // rejecting it means the current word was already invalid.
        if let Err(err) = self.processor.set_psr(psr) {
            if self.debug {
                log::warn!("interrupt mask: {}", err);
            }
        }
    }
}

/// Exclusive access to kernel tables with interrupts disabled
pub struct CriticalSection<'a, T> {
    guard: MutexGuard<'a, T>,
    mask: &'a InterruptMask,
    restore: bool,
}

impl<'a, T> CriticalSection<'a, T> {
    /// Enters a critical section on behalf of `operation`
    ///
    /// Halts the machine if the caller is not in kernel mode. A lock
    /// poisoned by a halted process is recovered: the machine is stopping
    /// anyway and the tables are only read for diagnostics after that.
    pub fn enter(
        tables: &'a Mutex<T>,
        mask: &'a InterruptMask,
        operation: &'static str,
    ) -> Self {
        require_kernel_mode(mask.processor.as_ref(), operation);
        let guard = tables.lock().unwrap_or_else(PoisonError::into_inner);
        let restore = mask.set_enabled(false);
        Self {
            guard,
            mask,
            restore,
        }
    }
}

impl<T> Deref for CriticalSection<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for CriticalSection<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for CriticalSection<'_, T> {
    fn drop(&mut self) {
        self.mask.set_enabled(self.restore);
    }
}
