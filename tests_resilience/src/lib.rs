//! Resilience Test Utilities
//!
//! This crate provides shared utilities for the cross-crate mailbox tests.
//!
//! ## Test Philosophy
//!
//! - **Real blocking**: Producers and consumers are simulated processes on
//!   their own threads, so a blocked send really is parked
//! - **Observe, don't sleep**: Tests wait for processes to reach a state
//!   (blocked, finished) with a deadline instead of guessing timings
//! - **No leaks**: After every scenario the slot pool and the block table
//!   are back where they started

use core_types::MailboxId;
use kernel_api::{KernelConfig, MailboxApi, MailboxError};
use sim_kernel::{ProcessHandle, SimulatedKernel};

/// Boots a kernel with default table sizes
pub fn test_bootstrap() -> SimulatedKernel {
    test_bootstrap_with(KernelConfig::default())
}

/// Boots a kernel with custom table sizes
pub fn test_bootstrap_with(config: KernelConfig) -> SimulatedKernel {
    SimulatedKernel::boot(config).expect("Failed to boot kernel")
}

/// Spawns a process that sends one message and returns the outcome
pub fn spawn_sender(
    kernel: &SimulatedKernel,
    name: &str,
    id: MailboxId,
    message: &[u8],
) -> ProcessHandle<Result<(), MailboxError>> {
    let mailboxes = kernel.mailboxes().clone();
    let message = message.to_vec();
    kernel
        .spawn(name, move || mailboxes.send(id, &message))
        .expect("Failed to spawn sender")
}

/// Spawns a process that receives one message into a `buffer_len`-byte buffer
pub fn spawn_receiver(
    kernel: &SimulatedKernel,
    name: &str,
    id: MailboxId,
    buffer_len: usize,
) -> ProcessHandle<Result<Vec<u8>, MailboxError>> {
    let mailboxes = kernel.mailboxes().clone();
    kernel
        .spawn(name, move || {
            let mut buffer = vec![0u8; buffer_len];
            let len = mailboxes.receive(id, &mut buffer)?;
            buffer.truncate(len);
            Ok(buffer)
        })
        .expect("Failed to spawn receiver")
}

/// Joins a process, failing the test if it panicked
pub fn finish<T>(handle: ProcessHandle<T>) -> T {
    let pid = handle.pid();
    handle
        .join()
        .unwrap_or_else(|_| panic!("{} panicked", pid))
}
