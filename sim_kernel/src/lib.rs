//! # Simulated Kernel
//!
//! This crate boots the mailbox layer on a simulated processor.
//!
//! ## Purpose
//!
//! The simulated kernel allows testing the mailbox layer without hardware:
//! - Runs under `cargo test`
//! - Simulated processes are plain threads, so blocking is real blocking
//! - Interrupts are raised explicitly by the test
//! - Inspectable (scheduler audit trail, mailbox occupancy, halt log)
//!
//! ## Philosophy
//!
//! **Testability is a first-class design constraint.**
//!
//! Nothing here is a mock of the mailbox layer. [`SimulatedKernel`] wires
//! the real [`MailboxEngine`] and the real interrupt handlers to a
//! simulated processor and scheduler.

pub mod processor;
pub mod scheduler;
pub mod test_utils;

pub use processor::SimProcessor;
pub use scheduler::{ProcessHandle, ProcessState, ScheduleEvent, SimScheduler};

use core_types::MailboxId;
use hal::DeviceType;
use ipc::{InterruptHandlers, MailboxEngine, SyscallArgs};
use kernel_api::{ConfigError, KernelConfig, MailboxError};
use std::sync::Arc;

/// An interrupt the simulated hardware can raise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Clock,
    Disk { unit: u32 },
    Terminal { unit: u32 },
    Syscall(SyscallArgs),
}

/// Simulated kernel state
///
/// Owns the processor, the scheduler, the mailbox engine and the interrupt
/// vector. All of it is reachable from tests.
pub struct SimulatedKernel {
    config: KernelConfig,
    processor: Arc<SimProcessor>,
    scheduler: Arc<SimScheduler>,
    mailboxes: Arc<MailboxEngine>,
    handlers: InterruptHandlers,
    device_mailboxes: Vec<MailboxId>,
}

impl SimulatedKernel {
    /// Boots a kernel
    ///
    /// Builds every table from `config` and creates the device mailboxes
    /// before anything else can create a mailbox.
    pub fn boot(config: KernelConfig) -> Result<Self, ConfigError> {
        let processor = Arc::new(SimProcessor::new());
        let scheduler = Arc::new(SimScheduler::with_process_limit(config.max_processes));
        let mailboxes = Arc::new(MailboxEngine::new(
            &config,
            processor.clone(),
            scheduler.clone(),
        )?);
        let device_mailboxes = ipc::create_device_mailboxes(&*mailboxes, &*processor);
        let handlers = InterruptHandlers::new(
            &config,
            mailboxes.clone(),
            scheduler.clone(),
            processor.clone(),
            processor.clone(),
        );

        log::info!(
            "booted: {} mailboxes, {} slots of {} bytes, {} process entries",
            config.max_mailboxes,
            config.max_slots,
            config.max_message,
            config.max_processes
        );

        Ok(Self {
            config,
            processor,
            scheduler,
            mailboxes,
            handlers,
            device_mailboxes,
        })
    }

    /// Boots with the default table sizes
    pub fn boot_default() -> Result<Self, ConfigError> {
        Self::boot(KernelConfig::default())
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn processor(&self) -> &Arc<SimProcessor> {
        &self.processor
    }

    pub fn scheduler(&self) -> &Arc<SimScheduler> {
        &self.scheduler
    }

    /// The mailbox API
    pub fn mailboxes(&self) -> &Arc<MailboxEngine> {
        &self.mailboxes
    }

    pub fn handlers(&self) -> &InterruptHandlers {
        &self.handlers
    }

    /// Device mailbox ids, in device order
    pub fn device_mailboxes(&self) -> &[MailboxId] {
        &self.device_mailboxes
    }

    /// Delivers an interrupt to its handler on the calling thread
    pub fn raise_interrupt(&self, interrupt: Interrupt) {
        match interrupt {
            Interrupt::Clock => self.handlers.clock(DeviceType::Clock.raw(), 0),
            Interrupt::Disk { unit } => self.handlers.disk(DeviceType::Disk.raw(), unit),
            Interrupt::Terminal { unit } => {
                self.handlers.terminal(DeviceType::Terminal.raw(), unit)
            }
            Interrupt::Syscall(args) => self.handlers.invalid_syscall(&args),
        }
    }

    /// Raises `ticks` clock interrupts
    pub fn tick_clock(&self, ticks: u32) {
        for _ in 0..ticks {
            self.raise_interrupt(Interrupt::Clock);
        }
    }

    /// Blocks the calling process until the device unit interrupts
    pub fn wait_device(&self, device: DeviceType, unit: u32) -> Result<u32, MailboxError> {
        ipc::wait_device(&*self.mailboxes, &*self.processor, device, unit)
    }

    /// Starts a simulated process
    pub fn spawn<F, T>(&self, name: &str, body: F) -> std::io::Result<ProcessHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.scheduler.spawn(name, body)
    }
}
