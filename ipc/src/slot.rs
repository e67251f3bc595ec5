//! Slot pool
//!
//! A fixed arena of message buffers shared by every mailbox. Buffers are
//! allocated once at boot, each large enough for the biggest message the
//! kernel allows. Free entries are kept on a free list, so allocation and
//! release never scan the pool.
//!
//! Occupied slots are chained into per-mailbox FIFO lists through their
//! `next` index. A [`SlotList`] only records the ends of such a chain; the
//! links live in the pool.

use core_types::MailboxId;
use kernel_api::MailboxError;

/// Index of a slot in the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotIndex(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Empty,
    Occupied {
        owner: MailboxId,
        size: usize,
        next: Option<SlotIndex>,
    },
}

#[derive(Debug)]
struct MailSlot {
    state: SlotState,
    data: Box<[u8]>,
}

/// FIFO chain of occupied slots owned by one mailbox
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotList {
    head: Option<SlotIndex>,
    tail: Option<SlotIndex>,
    len: usize,
}

impl SlotList {
    /// Number of slots in the chain
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Oldest slot in the chain
    pub fn front(&self) -> Option<SlotIndex> {
        self.head
    }
}

/// Fixed pool of message slots
#[derive(Debug)]
pub struct SlotPool {
    slots: Vec<MailSlot>,
    free: Vec<SlotIndex>,
    max_message: usize,
}

impl SlotPool {
    /// Creates a pool of `count` slots of `max_message` bytes each
    pub fn new(count: usize, max_message: usize) -> Self {
        let slots = (0..count)
            .map(|_| MailSlot {
                state: SlotState::Empty,
                data: vec![0u8; max_message].into_boxed_slice(),
            })
            .collect();
        // Reversed so the lowest index is handed out first.
        let free = (0..count).rev().map(SlotIndex).collect();
        Self {
            slots,
            free,
            max_message,
        }
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots not owned by any mailbox
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Takes a free slot for `owner` and stores `data` in it
    ///
    /// The slot is not linked into any list yet; see [`SlotPool::push_back`].
    pub fn allocate(&mut self, owner: MailboxId, data: &[u8]) -> Result<SlotIndex, MailboxError> {
        if data.len() > self.max_message {
            return Err(MailboxError::InvalidArgument(format!(
                "message of {} bytes exceeds the {}-byte slot size",
                data.len(),
                self.max_message
            )));
        }
        let index = self.free.pop().ok_or_else(|| {
            MailboxError::ResourceExhausted(format!(
                "all {} mail slots are in use",
                self.slots.len()
            ))
        })?;

        let slot = &mut self.slots[index.0];
        debug_assert_eq!(slot.state, SlotState::Empty, "free list held a live slot");
        slot.data[..data.len()].copy_from_slice(data);
        slot.state = SlotState::Occupied {
            owner,
            size: data.len(),
            next: None,
        };
        Ok(index)
    }

    /// Returns a slot to the pool
    ///
    /// The slot must already be unlinked from its owner's list.
    pub fn free(&mut self, index: SlotIndex) {
        let slot = &mut self.slots[index.0];
        if slot.state == SlotState::Empty {
            debug_assert!(false, "double free of {:?}", index);
            return;
        }
        slot.state = SlotState::Empty;
        self.free.push(index);
    }

    /// Mailbox that owns the slot, if any
    pub fn owner(&self, index: SlotIndex) -> Option<MailboxId> {
        match self.slots[index.0].state {
            SlotState::Empty => None,
            SlotState::Occupied { owner, .. } => Some(owner),
        }
    }

    /// Size of the stored message (0 for an empty slot)
    pub fn size(&self, index: SlotIndex) -> usize {
        match self.slots[index.0].state {
            SlotState::Empty => 0,
            SlotState::Occupied { size, .. } => size,
        }
    }

    /// Stored message bytes
    pub fn message(&self, index: SlotIndex) -> &[u8] {
        let size = self.size(index);
        &self.slots[index.0].data[..size]
    }

    /// Appends an occupied slot to the end of `list`
    pub fn push_back(&mut self, list: &mut SlotList, index: SlotIndex) {
        self.set_next(index, None);
        match list.tail {
            Some(tail) => self.set_next(tail, Some(index)),
            None => list.head = Some(index),
        }
        list.tail = Some(index);
        list.len += 1;
    }

    /// Unlinks and returns the oldest slot of `list`
    pub fn pop_front(&mut self, list: &mut SlotList) -> Option<SlotIndex> {
        let head = list.head?;
        let next = match self.slots[head.0].state {
            SlotState::Occupied { next, .. } => next,
            SlotState::Empty => None,
        };
        self.set_next(head, None);
        list.head = next;
        if next.is_none() {
            list.tail = None;
        }
        list.len -= 1;
        Some(head)
    }

    fn set_next(&mut self, index: SlotIndex, link: Option<SlotIndex>) {
        if let SlotState::Occupied { next, .. } = &mut self.slots[index.0].state {
            *next = link;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> MailboxId {
        MailboxId::from_raw(7)
    }

    #[test]
    fn test_allocate_stores_message() {
        let mut pool = SlotPool::new(4, 16);
        let slot = pool.allocate(owner(), b"hello").unwrap();

        assert_eq!(pool.message(slot), b"hello");
        assert_eq!(pool.size(slot), 5);
        assert_eq!(pool.owner(slot), Some(owner()));
        assert_eq!(pool.free_count(), 3);
    }

    #[test]
    fn test_live_allocations_are_distinct() {
        let mut pool = SlotPool::new(3, 8);
        let a = pool.allocate(owner(), b"a").unwrap();
        let b = pool.allocate(owner(), b"b").unwrap();
        let c = pool.allocate(owner(), b"c").unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_exhaustion() {
        let mut pool = SlotPool::new(1, 8);
        pool.allocate(owner(), b"x").unwrap();
        assert!(matches!(
            pool.allocate(owner(), b"y"),
            Err(MailboxError::ResourceExhausted(_))
        ));
    }

    #[test]
    fn test_free_makes_slot_reusable() {
        let mut pool = SlotPool::new(1, 8);
        let slot = pool.allocate(owner(), b"x").unwrap();
        pool.free(slot);

        assert_eq!(pool.owner(slot), None);
        assert_eq!(pool.free_count(), 1);
        let again = pool.allocate(owner(), b"y").unwrap();
        assert_eq!(again, slot);
        assert_eq!(pool.message(again), b"y");
    }

    #[test]
    fn test_oversized_message_rejected() {
        let mut pool = SlotPool::new(2, 4);
        assert!(matches!(
            pool.allocate(owner(), b"too long"),
            Err(MailboxError::InvalidArgument(_))
        ));
        assert_eq!(pool.free_count(), 2);
    }

    #[test]
    fn test_list_is_fifo() {
        let mut pool = SlotPool::new(4, 8);
        let mut list = SlotList::default();
        let messages: [&[u8]; 3] = [b"one", b"two", b"three"];
        for message in messages {
            let slot = pool.allocate(owner(), message).unwrap();
            pool.push_back(&mut list, slot);
        }
        assert_eq!(list.len(), 3);

        let mut seen = Vec::new();
        while let Some(slot) = pool.pop_front(&mut list) {
            seen.push(pool.message(slot).to_vec());
            pool.free(slot);
        }
        assert_eq!(seen, vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
        assert!(list.is_empty());
        assert_eq!(list.front(), None);
        assert_eq!(pool.free_count(), 4);
    }

    #[test]
    fn test_list_reusable_after_draining() {
        let mut pool = SlotPool::new(2, 8);
        let mut list = SlotList::default();
        let a = pool.allocate(owner(), b"a").unwrap();
        pool.push_back(&mut list, a);
        let popped = pool.pop_front(&mut list).unwrap();
        pool.free(popped);

        let b = pool.allocate(owner(), b"b").unwrap();
        pool.push_back(&mut list, b);
        assert_eq!(list.front(), Some(b));
        assert_eq!(list.len(), 1);
    }
}
