//! Single-process fakes for unit tests

use core_types::ProcessId;
use hal::{DeviceError, DeviceHal, DeviceType, HaltReason, ProcessorHal, Psr, PsrError};
use kernel_api::{BlockStatus, ProcessScheduler};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

pub struct FakeProcessor {
    psr: Mutex<Psr>,
    status: Mutex<HashMap<(DeviceType, u32), u32>>,
}

impl FakeProcessor {
    pub fn new(psr: Psr) -> Self {
        Self {
            psr: Mutex::new(psr),
            status: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_status(&self, device: DeviceType, unit: u32, value: u32) {
        self.status.lock().unwrap().insert((device, unit), value);
    }
}

impl ProcessorHal for FakeProcessor {
    fn psr(&self) -> Psr {
        *self.psr.lock().unwrap()
    }

    fn set_psr(&self, psr: Psr) -> Result<(), PsrError> {
        *self.psr.lock().unwrap() = psr.validate()?;
        Ok(())
    }

    fn halt(&self, reason: HaltReason) -> ! {
        panic!("machine halted: {}", reason)
    }
}

impl DeviceHal for FakeProcessor {
    fn device_status(&self, device: DeviceType, unit: u32) -> Result<u32, DeviceError> {
        if unit >= device.units() {
            return Err(DeviceError::NoSuchUnit { device, unit });
        }
        Ok(self
            .status
            .lock()
            .unwrap()
            .get(&(device, unit))
            .copied()
            .unwrap_or(0))
    }
}

/// Scheduler with exactly one process, which can never be parked
pub struct FakeScheduler {
    pid: ProcessId,
    pub unblocked: Mutex<Vec<ProcessId>>,
    pub slices: AtomicU32,
}

impl FakeScheduler {
    pub fn new(pid: u32) -> Self {
        Self {
            pid: ProcessId::new(pid),
            unblocked: Mutex::new(Vec::new()),
            slices: AtomicU32::new(0),
        }
    }
}

impl ProcessScheduler for FakeScheduler {
    fn current_pid(&self) -> ProcessId {
        self.pid
    }

    fn block_current(&self, status: BlockStatus) {
        panic!("{} would stay {} forever", self.pid, status);
    }

    fn unblock(&self, pid: ProcessId) {
        self.unblocked.lock().unwrap().push(pid);
    }

    fn time_slice(&self) {
        self.slices.fetch_add(1, Ordering::SeqCst);
    }
}
