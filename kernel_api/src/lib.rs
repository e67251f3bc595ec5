//! # Kernel API
//!
//! This crate defines the interface between processes and the mailbox
//! layer, and between the mailbox layer and its collaborators.
//!
//! ## Philosophy
//!
//! Mailboxes are the only primitive processes get:
//! - Message passing through bounded mailboxes (not shared memory)
//! - Synchronization through zero-capacity mailboxes (rendezvous)
//! - Cancellation through release (no timeouts)
//!
//! ## Design Goals
//!
//! 1. **Testability**: The scheduler and the processor are traits, so the
//!    whole layer runs under `cargo test`
//! 2. **Interrupt safety by type**: Interrupt handlers only ever see
//!    [`InterruptSafeMailbox`], which has no blocking operations
//! 3. **Recoverable vs fatal**: Recoverable outcomes are [`MailboxError`];
//!    broken invariants halt the machine through `hal::HaltReason`
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - A syscall interface (no argument marshalling)
//! - A scheduling policy (the scheduler is a collaborator)

pub mod config;
pub mod error;
pub mod mailbox;
pub mod scheduler;

pub use config::KernelConfig;
pub use error::{ConfigError, MailboxError};
pub use mailbox::{InterruptSafeMailbox, MailboxApi, MailboxStats};
pub use scheduler::{BlockStatus, ProcessScheduler};
