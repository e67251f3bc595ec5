//! Identifiers for processes and mailboxes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a simulated process
///
/// Process ids are issued by the scheduler collaborator. The mailbox layer
/// only stores and compares them; it never allocates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(u32);

impl ProcessId {
    /// Creates a process id from its raw value
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub const fn as_raw(&self) -> u32 {
        self.0
    }

    /// Returns the process block table entry this pid maps to
    pub fn table_index(&self, table_size: usize) -> usize {
        self.0 as usize % table_size
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pid({})", self.0)
    }
}

/// Identifier of a mailbox
///
/// The raw value is `generation * table_size + index`. A freshly booted
/// table issues generation 0, so the first mailboxes ever created have ids
/// equal to their table index. Every time an entry is cleared its
/// generation advances, which makes ids held by earlier users stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MailboxId(u32);

impl MailboxId {
    /// Creates a mailbox id from its raw value
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Composes an id from a table index and an entry generation
    ///
    /// Callers keep `generation` small enough for the product to fit in
    /// `u32`; the mailbox table wraps generations before that happens.
    pub fn compose(index: usize, generation: u32, table_size: usize) -> Self {
        Self(generation * table_size as u32 + index as u32)
    }

    /// Returns the raw value
    pub const fn as_raw(&self) -> u32 {
        self.0
    }

    /// Returns the table index encoded in this id
    pub fn index(&self, table_size: usize) -> usize {
        self.0 as usize % table_size
    }

    /// Returns the entry generation encoded in this id
    pub fn generation(&self, table_size: usize) -> u32 {
        self.0 / table_size as u32
    }
}

impl fmt::Display for MailboxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mailbox({})", self.0)
    }
}
