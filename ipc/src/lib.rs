//! # Mailbox IPC
//!
//! Message passing between simulated processes and from interrupt handlers
//! to driver processes.
//!
//! ## Model
//!
//! - A **mailbox** buffers up to `slot_capacity` messages. A capacity of
//!   zero makes it synchronous: a send completes only when it meets a
//!   receive.
//! - Messages live in **slots** taken from one pool shared by every
//!   mailbox. The pool, the mailbox table and the process block table are
//!   all sized once at boot.
//! - `send` blocks while a mailbox is full and `receive` blocks while it
//!   is empty. Blocked processes are served strictly first come, first
//!   served.
//! - Interrupt handlers use `cond_send` / `cond_receive`, which fail with
//!   `WouldBlock` instead of waiting.
//! - Releasing a mailbox wakes every process blocked on it. Each of them
//!   sees `Released`.
//!
//! Every operation requires kernel mode and runs with interrupts disabled.

pub mod block;
pub mod device;
pub mod engine;
pub mod guard;
pub mod interrupts;
pub mod slot;
pub mod table;

#[cfg(test)]
mod test_support;

pub use block::{BlockQueue, ProcTable, WakeOutcome};
pub use device::{create_device_mailboxes, device_mailbox_id, wait_device, DEVICE_MESSAGE_SIZE};
pub use engine::MailboxEngine;
pub use guard::{require_kernel_mode, CriticalSection, InterruptMask};
pub use interrupts::{InterruptHandlers, SyscallArgs};
pub use slot::{SlotIndex, SlotList, SlotPool};
pub use table::{Mailbox, MailboxTable};
