//! Test utilities for resilience testing
//!
//! Simulated processes run on real threads, so tests observe them by
//! polling with a deadline instead of sleeping for a fixed time.

use crate::{SimScheduler, SimulatedKernel};
use core_types::ProcessId;
use kernel_api::KernelConfig;
use std::thread;
use std::time::{Duration, Instant};

/// Default deadline for [`wait_until`]
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polls `condition` until it holds
///
/// # Panics
///
/// Panics with `what` if the condition still fails after `timeout`.
pub fn wait_until<F>(timeout: Duration, what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while !condition() {
        if Instant::now() >= deadline {
            panic!("timed out after {:?} waiting for {}", timeout, what);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Waits until `pid` is parked in the mailbox layer
pub fn wait_for_blocked(scheduler: &SimScheduler, pid: ProcessId) {
    wait_until(DEFAULT_TIMEOUT, &format!("{} to block", pid), || {
        scheduler.is_blocked(pid)
    });
}

/// Waits until exactly `count` processes are parked
pub fn wait_for_blocked_count(scheduler: &SimScheduler, count: usize) {
    wait_until(
        DEFAULT_TIMEOUT,
        &format!("{} blocked processes", count),
        || scheduler.blocked_count() == count,
    );
}

/// Boots a kernel from `config` and hands it to `f`
///
/// # Example
///
/// ```
/// use sim_kernel::test_utils::with_kernel;
/// use kernel_api::{KernelConfig, MailboxApi};
///
/// with_kernel(KernelConfig::default(), |kernel| {
///     let id = kernel.mailboxes().create(1, 8).unwrap();
///     kernel.mailboxes().send(id, b"ok").unwrap();
/// });
/// ```
pub fn with_kernel<F>(config: KernelConfig, f: F)
where
    F: FnOnce(&SimulatedKernel),
{
    let kernel = match SimulatedKernel::boot(config) {
        Ok(kernel) => kernel,
        Err(err) => panic!("boot failed: {}", err),
    };
    f(&kernel);
}
