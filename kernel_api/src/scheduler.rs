//! Scheduler collaborator interface
//!
//! The mailbox layer never switches contexts itself. When an operation has
//! to wait it records why in the process block table, leaves its critical
//! section and asks the scheduler to park the calling process. Whoever
//! completes the operation later asks the scheduler to resume it.

use core_types::ProcessId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a process is parked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockStatus {
    /// Waiting for room in a mailbox, or for a receiver on a zero-capacity one
    Send,
    /// Waiting for a message
    Receive,
    /// Waiting for every process woken by a release to acknowledge it
    Release,
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockStatus::Send => write!(f, "blocked-on-send"),
            BlockStatus::Receive => write!(f, "blocked-on-receive"),
            BlockStatus::Release => write!(f, "blocked-on-release"),
        }
    }
}

/// Process scheduler operations consumed by the mailbox layer
///
/// # Wake-up contract
///
/// `unblock` may be called before the target process reaches
/// `block_current` (it has left the critical section but not parked yet).
/// Implementations must remember such a wake-up so that the following
/// `block_current` returns immediately.
pub trait ProcessScheduler: Send + Sync {
    /// Returns the id of the calling process
    fn current_pid(&self) -> ProcessId;

    /// Parks the calling process until another flow unblocks it
    fn block_current(&self, status: BlockStatus);

    /// Makes a parked process runnable again
    fn unblock(&self, pid: ProcessId);

    /// Time-slice accounting hook, called on every clock interrupt
    fn time_slice(&self);
}
