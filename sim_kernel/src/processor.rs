//! Simulated processor
//!
//! One status word shared by every simulated process, plus a status
//! register per device unit. Halting records the reason and then panics
//! the calling thread, which is how tests observe a stopped machine.

use hal::{DeviceError, DeviceHal, DeviceType, HaltReason, ProcessorHal, Psr, PsrError};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// The simulated processor and its device registers
#[derive(Debug)]
pub struct SimProcessor {
    psr: Mutex<Psr>,
    device_status: Mutex<HashMap<(DeviceType, u32), u32>>,
    halts: Mutex<Vec<HaltReason>>,
}

impl SimProcessor {
    /// Processor in the reset state: kernel mode, interrupts enabled
    pub fn new() -> Self {
        Self {
            psr: Mutex::new(Psr::BOOT),
            device_status: Mutex::new(HashMap::new()),
            halts: Mutex::new(Vec::new()),
        }
    }

    /// Switches the processor to user mode
    pub fn enter_user_mode(&self) {
        let mut psr = self.psr.lock().unwrap_or_else(PoisonError::into_inner);
        *psr = psr.with_kernel_mode(false);
    }

    /// Switches the processor to kernel mode
    pub fn enter_kernel_mode(&self) {
        let mut psr = self.psr.lock().unwrap_or_else(PoisonError::into_inner);
        *psr = psr.with_kernel_mode(true);
    }

    /// Loads a device unit's status register
    pub fn set_device_status(
        &self,
        device: DeviceType,
        unit: u32,
        status: u32,
    ) -> Result<(), DeviceError> {
        if unit >= device.units() {
            return Err(DeviceError::NoSuchUnit { device, unit });
        }
        self.device_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((device, unit), status);
        Ok(())
    }

    /// Every halt requested so far, oldest first
    pub fn halts(&self) -> Vec<HaltReason> {
        self.halts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_halted(&self) -> bool {
        !self
            .halts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl Default for SimProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorHal for SimProcessor {
    fn psr(&self) -> Psr {
        *self.psr.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_psr(&self, psr: Psr) -> Result<(), PsrError> {
        let psr = psr.validate()?;
        *self.psr.lock().unwrap_or_else(PoisonError::into_inner) = psr;
        Ok(())
    }

    fn halt(&self, reason: HaltReason) -> ! {
        log::error!("machine halted: {}", reason);
        self.halts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(reason.clone());
        panic!("machine halted: {}", reason);
    }
}

impl DeviceHal for SimProcessor {
    fn device_status(&self, device: DeviceType, unit: u32) -> Result<u32, DeviceError> {
        if unit >= device.units() {
            return Err(DeviceError::NoSuchUnit { device, unit });
        }
        Ok(self
            .device_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(device, unit))
            .copied()
            .unwrap_or(0))
    }
}
