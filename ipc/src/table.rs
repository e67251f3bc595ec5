//! Mailbox table
//!
//! Fixed array of mailbox descriptors with a free list of unused entries.
//! Each entry carries a generation that advances whenever the entry is
//! cleared, so an id handed out before a release stops resolving once the
//! entry is reused.

use crate::block::BlockQueue;
use crate::slot::SlotList;
use core_types::{MailboxId, ProcessId};
use kernel_api::{MailboxError, MailboxStats};

/// A live mailbox
#[derive(Debug)]
pub struct Mailbox {
    pub id: MailboxId,
    pub slot_capacity: usize,
    pub message_size_limit: usize,
    /// Buffered messages, oldest first
    pub slots: SlotList,
    /// Processes blocked in `send`
    pub producers: BlockQueue,
    /// Processes blocked in `receive`
    pub consumers: BlockQueue,
    /// Set once `release` has started; the mailbox no longer resolves
    pub released: bool,
    /// Woken processes that have not yet observed the release
    pub pending_acks: usize,
    /// Process waiting in `release` for the acknowledgements
    pub releaser: Option<ProcessId>,
}

impl Mailbox {
    fn new(id: MailboxId, slot_capacity: usize, message_size_limit: usize) -> Self {
        Self {
            id,
            slot_capacity,
            message_size_limit,
            slots: SlotList::default(),
            producers: BlockQueue::default(),
            consumers: BlockQueue::default(),
            released: false,
            pending_acks: 0,
            releaser: None,
        }
    }

    /// Whether another message can be buffered
    pub fn has_room(&self) -> bool {
        self.slot_capacity > 0 && self.slots.len() < self.slot_capacity
    }

    pub fn stats(&self) -> MailboxStats {
        MailboxStats {
            id: self.id,
            slot_capacity: self.slot_capacity,
            message_size_limit: self.message_size_limit,
            occupied: self.slots.len(),
            blocked_producers: self.producers.len(),
            blocked_consumers: self.consumers.len(),
        }
    }
}

#[derive(Debug)]
enum EntryState {
    Empty,
    Live(Mailbox),
}

#[derive(Debug)]
struct MailboxEntry {
    generation: u32,
    state: EntryState,
}

/// Fixed table of mailbox descriptors
#[derive(Debug)]
pub struct MailboxTable {
    entries: Vec<MailboxEntry>,
    free: Vec<usize>,
    /// Generations run from 0 up to (excluding) this bound, then wrap
    generation_limit: u32,
}

impl MailboxTable {
    pub fn new(size: usize) -> Self {
        let entries = (0..size)
            .map(|_| MailboxEntry {
                generation: 0,
                state: EntryState::Empty,
            })
            .collect();
        let free = (0..size).rev().collect();
        Self {
            entries,
            free,
            generation_limit: (u32::MAX / size.max(1) as u32).max(1),
        }
    }

    /// Number of live mailboxes, including ones being released
    pub fn live_count(&self) -> usize {
        self.entries.len() - self.free.len()
    }

    /// Takes a free entry and initializes a mailbox in it
    pub fn allocate(
        &mut self,
        slot_capacity: usize,
        message_size_limit: usize,
    ) -> Result<MailboxId, MailboxError> {
        let index = self.free.pop().ok_or_else(|| {
            MailboxError::ResourceExhausted(format!(
                "all {} mailboxes are in use",
                self.entries.len()
            ))
        })?;
        let size = self.entries.len();
        let entry = &mut self.entries[index];
        let id = MailboxId::compose(index, entry.generation, size);
        entry.state = EntryState::Live(Mailbox::new(id, slot_capacity, message_size_limit));
        Ok(id)
    }

    fn entry_mut(&mut self, id: MailboxId) -> Option<&mut Mailbox> {
        let size = self.entries.len();
        let entry = self.entries.get_mut(id.index(size))?;
        if entry.generation != id.generation(size) {
            return None;
        }
        match &mut entry.state {
            EntryState::Live(mailbox) => Some(mailbox),
            EntryState::Empty => None,
        }
    }

    /// Resolves a live, unreleased mailbox
    pub fn lookup(&self, id: MailboxId) -> Result<&Mailbox, MailboxError> {
        let size = self.entries.len();
        let entry = self
            .entries
            .get(id.index(size))
            .ok_or(MailboxError::NotFound(id))?;
        match &entry.state {
            EntryState::Live(mailbox)
                if entry.generation == id.generation(size) && !mailbox.released =>
            {
                Ok(mailbox)
            }
            _ => Err(MailboxError::NotFound(id)),
        }
    }

    /// Resolves a live, unreleased mailbox for modification
    pub fn lookup_mut(&mut self, id: MailboxId) -> Result<&mut Mailbox, MailboxError> {
        match self.entry_mut(id) {
            Some(mailbox) if !mailbox.released => Ok(mailbox),
            _ => Err(MailboxError::NotFound(id)),
        }
    }

    /// Resolves a mailbox whose release is still in progress
    pub fn releasing_mut(&mut self, id: MailboxId) -> Option<&mut Mailbox> {
        self.entry_mut(id).filter(|mailbox| mailbox.released)
    }

    /// Returns an entry to the free list and advances its generation
    pub fn clear(&mut self, id: MailboxId) {
        let size = self.entries.len();
        let index = id.index(size);
        let limit = self.generation_limit;
        let Some(entry) = self.entries.get_mut(index) else {
            return;
        };
        if entry.generation != id.generation(size) || matches!(entry.state, EntryState::Empty) {
            return;
        }
        entry.state = EntryState::Empty;
        entry.generation = (entry.generation + 1) % limit;
        self.free.push(index);
    }
}
