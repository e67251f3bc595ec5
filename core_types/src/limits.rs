//! Default sizes of the fixed kernel tables.
//!
//! These are the values the kernel boots with when no configuration
//! overrides them.

/// Number of mailbox descriptors in the mailbox table
pub const MAX_MAILBOXES: usize = 2000;

/// Number of message buffers shared by all mailboxes
pub const MAX_SLOTS: usize = 2500;

/// Largest message, in bytes, any mailbox may carry
pub const MAX_MESSAGE: usize = 150;

/// Number of entries in the process block table
pub const MAX_PROCESSES: usize = 50;

/// Clock interrupts per clock mailbox notification
pub const CLOCK_BATCH: u32 = 5;
