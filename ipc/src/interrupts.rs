//! Interrupt handlers
//!
//! Handlers run on whatever process was interrupted, so they only ever use
//! the non-blocking mailbox operations.

use crate::device::device_mailbox_id;
use core_types::MailboxId;
use hal::{DeviceHal, DeviceType, HaltReason, ProcessorHal};
use kernel_api::{InterruptSafeMailbox, KernelConfig, MailboxError, ProcessScheduler};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Arguments of a trapped system call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyscallArgs {
    pub number: u32,
    pub args: [u64; 5],
}

/// The interrupt vector's device and syscall entries
pub struct InterruptHandlers {
    mailboxes: Arc<dyn InterruptSafeMailbox>,
    scheduler: Arc<dyn ProcessScheduler>,
    processor: Arc<dyn ProcessorHal>,
    devices: Arc<dyn DeviceHal>,
    clock_ticks: AtomicU32,
    clock_batch: u32,
    debug: bool,
}

impl InterruptHandlers {
    pub fn new(
        config: &KernelConfig,
        mailboxes: Arc<dyn InterruptSafeMailbox>,
        scheduler: Arc<dyn ProcessScheduler>,
        processor: Arc<dyn ProcessorHal>,
        devices: Arc<dyn DeviceHal>,
    ) -> Self {
        Self {
            mailboxes,
            scheduler,
            processor,
            devices,
            clock_ticks: AtomicU32::new(0),
            clock_batch: config.clock_batch.max(1),
            debug: config.debug,
        }
    }

    /// Clock interrupt
    ///
    /// Drives time-slicing on every tick and notifies the clock device
    /// mailbox once per batch of ticks. A wrong type or unit is only
    /// reported; the notification still goes to the clock mailbox.
    pub fn clock(&self, device_type: u32, unit: u32) {
        if self.debug {
            log::debug!("clock(): called");
        }
        if device_type != DeviceType::Clock.raw() {
            log::warn!("clock(): called with wrong type {}", device_type);
        }
        if unit != 0 {
            log::warn!("clock(): called with invalid unit number {}", unit);
        }

        self.scheduler.time_slice();

        let ticks = self.clock_ticks.fetch_add(1, Ordering::SeqCst) + 1;
        if ticks >= self.clock_batch {
            self.clock_ticks.store(0, Ordering::SeqCst);
            let id = device_mailbox_id(self.processor.as_ref(), DeviceType::Clock.raw(), 0);
            self.post(id, &[], "clock");
        }
    }

    /// Disk interrupt
    pub fn disk(&self, device_type: u32, unit: u32) {
        self.device_interrupt(DeviceType::Disk, device_type, unit);
    }

    /// Terminal interrupt
    pub fn terminal(&self, device_type: u32, unit: u32) {
        self.device_interrupt(DeviceType::Terminal, device_type, unit);
    }

    /// Entry for system call numbers without a handler
    pub fn invalid_syscall(&self, args: &SyscallArgs) -> ! {
        log::error!("invalid syscall {} {:?}", args.number, args.args);
        self.processor
            .halt(HaltReason::InvalidSyscall { number: args.number })
    }

    /// Clock ticks counted towards the next notification
    pub fn pending_ticks(&self) -> u32 {
        self.clock_ticks.load(Ordering::SeqCst)
    }

    fn device_interrupt(&self, device: DeviceType, device_type: u32, unit: u32) {
        let name = match device {
            DeviceType::Clock => "clock",
            DeviceType::Disk => "disk",
            DeviceType::Terminal => "terminal",
        };
        if self.debug {
            log::debug!("{}(): called for unit {}", name, unit);
        }
        if device_type != device.raw() {
            log::warn!("{}(): called with wrong type {}", name, device_type);
            return;
        }

        let id = device_mailbox_id(self.processor.as_ref(), device_type, unit);
        let status = match self.devices.device_status(device, unit) {
            Ok(status) => status,
            Err(err) => {
                log::warn!("{}(): {}", name, err);
                return;
            }
        };
        self.post(id, &status.to_le_bytes(), name);
    }

    fn post(&self, id: MailboxId, message: &[u8], name: &str) {
        match self.mailboxes.cond_send(id, message) {
            Ok(()) => {
                if self.debug {
                    log::debug!("{}(): notified {}", name, id);
                }
            }
            // Nobody is waiting on the device right now.
            Err(MailboxError::WouldBlock) => {
                if self.debug {
                    log::debug!("{}(): no waiter on {}", name, id);
                }
            }
            Err(err) => log::warn!("{}(): {}", name, err),
        }
    }
}
