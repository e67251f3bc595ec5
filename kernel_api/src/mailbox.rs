//! Mailbox API traits and types

use crate::MailboxError;
use core_types::MailboxId;
use serde::{Deserialize, Serialize};

/// Snapshot of one mailbox's occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxStats {
    pub id: MailboxId,
    /// Maximum buffered messages (0 = synchronous)
    pub slot_capacity: usize,
    /// Largest message the mailbox accepts
    pub message_size_limit: usize,
    /// Messages currently buffered
    pub occupied: usize,
    /// Processes blocked in `send`
    pub blocked_producers: usize,
    /// Processes blocked in `receive`
    pub blocked_consumers: usize,
}

/// Non-blocking mailbox operations
///
/// This is the only view of the mailbox layer that interrupt handlers are
/// given. Neither operation ever suspends the caller.
pub trait InterruptSafeMailbox: Send + Sync {
    /// Sends a message only if it can be delivered or buffered right now
    ///
    /// # Errors
    ///
    /// - [`MailboxError::WouldBlock`] if the mailbox is full (or has no
    ///   waiting receiver when it has zero capacity)
    /// - [`MailboxError::InvalidArgument`] if the message exceeds the limit
    /// - [`MailboxError::NotFound`] if the id is unknown
    /// - [`MailboxError::ResourceExhausted`] if the slot pool is empty
    fn cond_send(&self, id: MailboxId, data: &[u8]) -> Result<(), MailboxError>;

    /// Receives a message only if one is available right now
    ///
    /// Returns the number of bytes copied into `buffer`.
    fn cond_receive(&self, id: MailboxId, buffer: &mut [u8]) -> Result<usize, MailboxError>;
}

/// The mailbox API
///
/// Every operation requires kernel mode; calling one from user mode halts
/// the machine.
///
/// # Example
///
/// ```
/// use kernel_api::{MailboxApi, MailboxError};
///
/// fn echo<M: MailboxApi>(mailboxes: &M) -> Result<(), MailboxError> {
///     let id = mailboxes.create(1, 16)?;
///     mailboxes.send(id, b"ping")?;
///     let mut buffer = [0u8; 16];
///     let len = mailboxes.receive(id, &mut buffer)?;
///     assert_eq!(&buffer[..len], b"ping");
///     mailboxes.release(id)
/// }
/// ```
pub trait MailboxApi: InterruptSafeMailbox {
    /// Creates a mailbox
    ///
    /// `slot_capacity == 0` creates a synchronous mailbox where every send
    /// must meet a receive.
    fn create(
        &self,
        slot_capacity: usize,
        message_size_limit: usize,
    ) -> Result<MailboxId, MailboxError>;

    /// Sends a message, blocking while the mailbox is full
    ///
    /// Returns [`MailboxError::Released`] if the mailbox was released while
    /// the caller was blocked.
    fn send(&self, id: MailboxId, data: &[u8]) -> Result<(), MailboxError>;

    /// Receives the oldest message, blocking while none is available
    ///
    /// Returns the number of bytes copied into `buffer`.
    fn receive(&self, id: MailboxId, buffer: &mut [u8]) -> Result<usize, MailboxError>;

    /// Releases a mailbox, waking every process blocked on it
    fn release(&self, id: MailboxId) -> Result<(), MailboxError>;
}
