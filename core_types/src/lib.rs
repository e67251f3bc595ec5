//! # Core Types
//!
//! This crate defines the fundamental identifiers shared by the mailbox
//! layer, its collaborators and its tests.
//!
//! ## Philosophy
//!
//! - **Ids are plain numbers**: A process id is what the scheduler hands out,
//!   a mailbox id is what the mailbox table hands out. Both are `Copy` and
//!   cheap to log.
//! - **Ids carry their own staleness check**: A mailbox id embeds the
//!   generation of the table entry it was issued for, so an id that outlives
//!   its mailbox can never reach a newer occupant of the same entry.
//!
//! ## Key Types
//!
//! - [`ProcessId`]: Identifier of a simulated process
//! - [`MailboxId`]: Generation-tagged identifier of a mailbox table entry
//! - [`limits`]: Default sizes of the fixed kernel tables

pub mod ids;
pub mod limits;

pub use ids::{MailboxId, ProcessId};
