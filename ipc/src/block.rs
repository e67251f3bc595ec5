//! Process block table
//!
//! One descriptor per process table entry, recording why a process is
//! parked and holding its message while it cannot run. A blocked sender's
//! message is copied in when it parks; a blocked receiver's descriptor is
//! where the delivering sender writes. The parked process only reads its
//! descriptor again after it resumes.
//!
//! Descriptor lifecycle: `Empty -> Blocked -> Woken -> Empty`.
//!
//! Mailbox wait queues are chains through the descriptors' `next` links,
//! so queueing a process never allocates.

use core_types::{MailboxId, ProcessId};
use hal::HaltReason;
use kernel_api::BlockStatus;

/// How a parked process's operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeOutcome {
    /// The message was transferred; carries its length
    Delivered(usize),
    /// A message arrived that was larger than the receiver's buffer
    TooLarge(usize),
    /// The mailbox was released
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DescriptorState {
    Empty,
    Blocked {
        pid: ProcessId,
        status: BlockStatus,
        mailbox: MailboxId,
        /// Length of a blocked sender's message
        len: usize,
        /// Buffer size of a blocked receiver
        capacity: usize,
    },
    Woken {
        pid: ProcessId,
        status: BlockStatus,
        outcome: WakeOutcome,
    },
}

#[derive(Debug)]
struct BlockDescriptor {
    state: DescriptorState,
    next: Option<usize>,
    buffer: Box<[u8]>,
}

/// FIFO queue of blocked processes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockQueue {
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl BlockQueue {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Fixed table of block descriptors, keyed by `pid % size`
#[derive(Debug)]
pub struct ProcTable {
    entries: Vec<BlockDescriptor>,
}

impl ProcTable {
    /// Creates a table of `size` descriptors with `max_message`-byte buffers
    pub fn new(size: usize, max_message: usize) -> Self {
        let entries = (0..size)
            .map(|_| BlockDescriptor {
                state: DescriptorState::Empty,
                next: None,
                buffer: vec![0u8; max_message].into_boxed_slice(),
            })
            .collect();
        Self { entries }
    }

    fn index(&self, pid: ProcessId) -> usize {
        pid.table_index(self.entries.len())
    }

    /// Records that `pid` is about to park
    ///
    /// A sender passes its message; a receiver passes an empty message and
    /// its buffer size.
    ///
    /// # Errors
    ///
    /// Returns [`HaltReason::BlockEntryInUse`] if the entry still describes
    /// a live process. That means the table bookkeeping is corrupt.
    pub fn park(
        &mut self,
        pid: ProcessId,
        status: BlockStatus,
        mailbox: MailboxId,
        message: &[u8],
        capacity: usize,
    ) -> Result<(), HaltReason> {
        let index = self.index(pid);
        let entry = &mut self.entries[index];
        match entry.state {
            DescriptorState::Empty => {}
            DescriptorState::Blocked { pid: occupant, .. }
            | DescriptorState::Woken { pid: occupant, .. } => {
                return Err(HaltReason::BlockEntryInUse { pid, occupant });
            }
        }
        if message.len() > entry.buffer.len() {
            return Err(HaltReason::IllegalState {
                operation: "park".to_string(),
                detail: format!(
                    "{} parked with a {}-byte message",
                    pid,
                    message.len()
                ),
            });
        }

        entry.buffer[..message.len()].copy_from_slice(message);
        entry.next = None;
        entry.state = DescriptorState::Blocked {
            pid,
            status,
            mailbox,
            len: message.len(),
            capacity: capacity.min(entry.buffer.len()),
        };
        Ok(())
    }

    /// Appends `pid` to the back of `queue`
    pub fn enqueue(&mut self, queue: &mut BlockQueue, pid: ProcessId) {
        let index = self.index(pid);
        self.entries[index].next = None;
        match queue.tail {
            Some(tail) => self.entries[tail].next = Some(index),
            None => queue.head = Some(index),
        }
        queue.tail = Some(index);
        queue.len += 1;
    }

    /// Removes and returns the earliest process in `queue`
    pub fn dequeue(&mut self, queue: &mut BlockQueue) -> Option<ProcessId> {
        let head = queue.head?;
        let entry = &mut self.entries[head];
        queue.head = entry.next.take();
        if queue.head.is_none() {
            queue.tail = None;
        }
        queue.len -= 1;
        entry_pid(entry.state)
    }

    /// Earliest process in `queue`, left in place
    pub fn front(&self, queue: &BlockQueue) -> Option<ProcessId> {
        queue.head.and_then(|head| entry_pid(self.entries[head].state))
    }

    /// Processes in `queue`, earliest first
    pub fn queued<'a>(&'a self, queue: &BlockQueue) -> impl Iterator<Item = ProcessId> + 'a {
        let mut cursor = queue.head;
        std::iter::from_fn(move || {
            let index = cursor?;
            cursor = self.entries[index].next;
            entry_pid(self.entries[index].state)
        })
    }

    /// Message held by a blocked sender
    pub fn pending_message(&self, pid: ProcessId) -> &[u8] {
        let entry = &self.entries[self.index(pid)];
        match entry.state {
            DescriptorState::Blocked { len, .. } => &entry.buffer[..len],
            _ => &[],
        }
    }

    /// Buffer size of a blocked receiver
    pub fn receive_capacity(&self, pid: ProcessId) -> usize {
        match self.entries[self.index(pid)].state {
            DescriptorState::Blocked { capacity, .. } => capacity,
            _ => 0,
        }
    }

    /// Writes a message into a blocked receiver's descriptor and marks it woken
    ///
    /// The caller has checked `data` against [`ProcTable::receive_capacity`].
    pub fn deliver(&mut self, pid: ProcessId, data: &[u8]) {
        let index = self.index(pid);
        let entry = &mut self.entries[index];
        entry.buffer[..data.len()].copy_from_slice(data);
        if let DescriptorState::Blocked { pid, status, .. } = entry.state {
            entry.state = DescriptorState::Woken {
                pid,
                status,
                outcome: WakeOutcome::Delivered(data.len()),
            };
        }
    }

    /// Marks a blocked process woken with `outcome`
    pub fn wake(&mut self, pid: ProcessId, outcome: WakeOutcome) {
        let index = self.index(pid);
        let entry = &mut self.entries[index];
        if let DescriptorState::Blocked { pid, status, .. } = entry.state {
            entry.state = DescriptorState::Woken {
                pid,
                status,
                outcome,
            };
        }
    }

    /// Collects the outcome of a resumed process and clears its descriptor
    ///
    /// A receiver's delivered message is copied into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`HaltReason::IllegalState`] if the descriptor was never
    /// woken: the process resumed without anyone completing its operation.
    pub fn take(&mut self, pid: ProcessId, out: &mut [u8]) -> Result<WakeOutcome, HaltReason> {
        let index = self.index(pid);
        let entry = &mut self.entries[index];
        match entry.state {
            DescriptorState::Woken {
                pid: owner,
                status,
                outcome,
            } if owner == pid => {
                if let (BlockStatus::Receive, WakeOutcome::Delivered(len)) = (status, outcome) {
                    out[..len].copy_from_slice(&entry.buffer[..len]);
                }
                entry.state = DescriptorState::Empty;
                entry.next = None;
                Ok(outcome)
            }
            DescriptorState::Blocked {
                pid: owner,
                mailbox,
                ..
            } if owner == pid => Err(HaltReason::IllegalState {
                operation: "take".to_string(),
                detail: format!("{} resumed while still blocked on {}", pid, mailbox),
            }),
            state => Err(HaltReason::IllegalState {
                operation: "take".to_string(),
                detail: format!("{} resumed with descriptor {:?}", pid, state),
            }),
        }
    }

    /// Number of descriptors currently in use
    pub fn live_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.state != DescriptorState::Empty)
            .count()
    }
}

fn entry_pid(state: DescriptorState) -> Option<ProcessId> {
    match state {
        DescriptorState::Empty => None,
        DescriptorState::Blocked { pid, .. } | DescriptorState::Woken { pid, .. } => Some(pid),
    }
}
