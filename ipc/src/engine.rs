//! Mailbox engine
//!
//! Owns the three kernel tables (mailboxes, slots, process block
//! descriptors) behind one lock and implements the mailbox API on top of
//! them.
//!
//! ## Blocking
//!
//! An operation that cannot complete records itself in the block table,
//! joins the mailbox's producer or consumer queue, leaves the critical
//! section and asks the scheduler to park it. The process that later
//! completes the operation does all the work on the parked process's
//! behalf (copies the message, frees or fills slots) and marks the
//! descriptor woken before unblocking it. The resumed process only reads
//! the outcome back.
//!
//! ## Release
//!
//! Releasing a mailbox wakes everyone queued on it with a release outcome
//! and parks the releaser until each of them has observed it. The last
//! one to do so clears the table entry and resumes the releaser.

use crate::block::{ProcTable, WakeOutcome};
use crate::guard::{CriticalSection, InterruptMask};
use crate::slot::SlotPool;
use crate::table::MailboxTable;
use core_types::{MailboxId, ProcessId};
use hal::{HaltReason, ProcessorHal};
use kernel_api::{
    BlockStatus, ConfigError, InterruptSafeMailbox, KernelConfig, MailboxApi, MailboxError,
    MailboxStats, ProcessScheduler,
};
use std::sync::{Arc, Mutex};

struct Tables {
    mailboxes: MailboxTable,
    slots: SlotPool,
    procs: ProcTable,
}

/// The mailbox layer
pub struct MailboxEngine {
    tables: Mutex<Tables>,
    mask: InterruptMask,
    processor: Arc<dyn ProcessorHal>,
    scheduler: Arc<dyn ProcessScheduler>,
    max_message: usize,
    debug: bool,
}

impl MailboxEngine {
    /// Allocates every table from `config`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the tables cannot be built from
    /// `config`.
    pub fn new(
        config: &KernelConfig,
        processor: Arc<dyn ProcessorHal>,
        scheduler: Arc<dyn ProcessScheduler>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let tables = Tables {
            mailboxes: MailboxTable::new(config.max_mailboxes),
            slots: SlotPool::new(config.max_slots, config.max_message),
            procs: ProcTable::new(config.max_processes, config.max_message),
        };
        Ok(Self {
            tables: Mutex::new(tables),
            mask: InterruptMask::new(processor.clone(), config.debug),
            processor,
            scheduler,
            max_message: config.max_message,
            debug: config.debug,
        })
    }

    /// Occupancy of a live mailbox
    pub fn stats(&self, id: MailboxId) -> Result<MailboxStats, MailboxError> {
        let section = self.enter("stats");
        section.mailboxes.lookup(id).map(|mailbox| mailbox.stats())
    }

    /// Slots not holding any message
    pub fn free_slots(&self) -> usize {
        self.enter("free_slots").slots.free_count()
    }

    /// Mailboxes in use, including ones still being released
    pub fn live_mailboxes(&self) -> usize {
        self.enter("live_mailboxes").mailboxes.live_count()
    }

    /// Processes currently parked or waiting to collect an outcome
    pub fn blocked_processes(&self) -> usize {
        self.enter("blocked_processes").procs.live_count()
    }

    fn enter(&self, operation: &'static str) -> CriticalSection<'_, Tables> {
        CriticalSection::enter(&self.tables, &self.mask, operation)
    }

    fn halt(&self, reason: HaltReason) -> ! {
        log::error!("halting: {}", reason);
        self.processor.halt(reason)
    }

    fn park(
        &self,
        procs: &mut ProcTable,
        pid: ProcessId,
        status: BlockStatus,
        id: MailboxId,
        message: &[u8],
        capacity: usize,
    ) {
        if let Err(reason) = procs.park(pid, status, id, message, capacity) {
            self.halt(reason);
        }
    }

    fn send_inner(
        &self,
        id: MailboxId,
        data: &[u8],
        blocking: bool,
        operation: &'static str,
    ) -> Result<(), MailboxError> {
        let mut section = self.enter(operation);
        let Tables {
            mailboxes,
            slots,
            procs,
        } = &mut *section;

        let mailbox = mailboxes.lookup_mut(id)?;
        if data.len() > mailbox.message_size_limit {
            return Err(MailboxError::InvalidArgument(format!(
                "{}-byte message exceeds the {}-byte limit of {}",
                data.len(),
                mailbox.message_size_limit,
                id
            )));
        }

        if !blocking {
            let receiver_fits = procs
                .queued(&mailbox.consumers)
                .any(|consumer| procs.receive_capacity(consumer) >= data.len());
            if !receiver_fits && !mailbox.has_room() {
                return Err(MailboxError::WouldBlock);
            }
        }

        // Hand the message straight to the earliest waiting receiver.
        while let Some(consumer) = procs.dequeue(&mut mailbox.consumers) {
            if procs.receive_capacity(consumer) < data.len() {
                if self.debug {
                    log::debug!(
                        "{}(): {} bytes too large for {} on {}",
                        operation,
                        data.len(),
                        consumer,
                        id
                    );
                }
                procs.wake(consumer, WakeOutcome::TooLarge(data.len()));
                self.scheduler.unblock(consumer);
                continue;
            }
            procs.deliver(consumer, data);
            self.scheduler.unblock(consumer);
            if self.debug {
                log::debug!(
                    "{}(): {} bytes handed to {} on {}",
                    operation,
                    data.len(),
                    consumer,
                    id
                );
            }
            return Ok(());
        }

        if mailbox.has_room() {
            let slot = slots.allocate(id, data)?;
            slots.push_back(&mut mailbox.slots, slot);
            if self.debug {
                log::debug!(
                    "{}(): {} bytes buffered in {} ({}/{})",
                    operation,
                    data.len(),
                    id,
                    mailbox.slots.len(),
                    mailbox.slot_capacity
                );
            }
            return Ok(());
        }

        if !blocking {
            return Err(MailboxError::WouldBlock);
        }

        let pid = self.scheduler.current_pid();
        self.park(procs, pid, BlockStatus::Send, id, data, 0);
        procs.enqueue(&mut mailbox.producers, pid);
        if self.debug {
            log::debug!("{}(): {} blocks sending to {}", operation, pid, id);
        }
        drop(section);

        self.scheduler.block_current(BlockStatus::Send);
        self.finish_wait(pid, id, &mut []).map(|_| ())
    }

    fn receive_inner(
        &self,
        id: MailboxId,
        buffer: &mut [u8],
        blocking: bool,
        operation: &'static str,
    ) -> Result<usize, MailboxError> {
        let mut section = self.enter(operation);
        let Tables {
            mailboxes,
            slots,
            procs,
        } = &mut *section;

        let mailbox = mailboxes.lookup_mut(id)?;

        if let Some(front) = mailbox.slots.front() {
            let size = slots.size(front);
            if size > buffer.len() {
                return Err(too_small(size, buffer.len()));
            }
            slots.pop_front(&mut mailbox.slots);
            debug_assert_eq!(slots.owner(front), Some(id), "slot chained to the wrong mailbox");
            buffer[..size].copy_from_slice(slots.message(front));
            slots.free(front);

            // A slot just opened up; move the earliest blocked sender in.
            if let Some(producer) = procs.dequeue(&mut mailbox.producers) {
                let message = procs.pending_message(producer);
                let len = message.len();
                match slots.allocate(id, message) {
                    Ok(slot) => slots.push_back(&mut mailbox.slots, slot),
                    Err(err) => self.halt(HaltReason::IllegalState {
                        operation: operation.to_string(),
                        detail: format!("no slot for blocked {}: {}", producer, err),
                    }),
                }
                procs.wake(producer, WakeOutcome::Delivered(len));
                self.scheduler.unblock(producer);
            }

            if self.debug {
                log::debug!("{}(): {} bytes taken from {}", operation, size, id);
            }
            return Ok(size);
        }

        // Zero-capacity mailbox: take the message from a waiting sender.
        if let Some(producer) = procs.front(&mailbox.producers) {
            let message = procs.pending_message(producer);
            let len = message.len();
            if len > buffer.len() {
                return Err(too_small(len, buffer.len()));
            }
            buffer[..len].copy_from_slice(message);
            procs.dequeue(&mut mailbox.producers);
            procs.wake(producer, WakeOutcome::Delivered(len));
            self.scheduler.unblock(producer);

            if self.debug {
                log::debug!(
                    "{}(): {} bytes taken from {} on {}",
                    operation,
                    len,
                    producer,
                    id
                );
            }
            return Ok(len);
        }

        if !blocking {
            return Err(MailboxError::WouldBlock);
        }

        let pid = self.scheduler.current_pid();
        let capacity = buffer.len().min(self.max_message);
        self.park(procs, pid, BlockStatus::Receive, id, &[], capacity);
        procs.enqueue(&mut mailbox.consumers, pid);
        if self.debug {
            log::debug!("{}(): {} blocks receiving from {}", operation, pid, id);
        }
        drop(section);

        self.scheduler.block_current(BlockStatus::Receive);
        self.finish_wait(pid, id, buffer)
    }

    /// Collects the outcome of a resumed send or receive
    fn finish_wait(
        &self,
        pid: ProcessId,
        id: MailboxId,
        out: &mut [u8],
    ) -> Result<usize, MailboxError> {
        let mut section = self.enter("wait");
        let Tables {
            mailboxes, procs, ..
        } = &mut *section;

        let outcome = match procs.take(pid, out) {
            Ok(outcome) => outcome,
            Err(reason) => self.halt(reason),
        };
        match outcome {
            WakeOutcome::Delivered(len) => Ok(len),
            WakeOutcome::TooLarge(len) => Err(too_small(len, out.len())),
            WakeOutcome::Released => {
                let finished = match mailboxes.releasing_mut(id) {
                    Some(mailbox) => {
                        mailbox.pending_acks = mailbox.pending_acks.saturating_sub(1);
                        if mailbox.pending_acks == 0 {
                            Some(mailbox.releaser.take())
                        } else {
                            None
                        }
                    }
                    None => None,
                };
                if let Some(releaser) = finished {
                    mailboxes.clear(id);
                    if let Some(releaser) = releaser {
                        procs.wake(releaser, WakeOutcome::Released);
                        self.scheduler.unblock(releaser);
                    }
                }
                if self.debug {
                    log::debug!("{} observed the release of {}", pid, id);
                }
                Err(MailboxError::Released(id))
            }
        }
    }
}

fn too_small(len: usize, buffer: usize) -> MailboxError {
    MailboxError::InvalidArgument(format!(
        "{}-byte message does not fit a {}-byte buffer",
        len, buffer
    ))
}

impl InterruptSafeMailbox for MailboxEngine {
    fn cond_send(&self, id: MailboxId, data: &[u8]) -> Result<(), MailboxError> {
        self.send_inner(id, data, false, "cond_send")
    }

    fn cond_receive(&self, id: MailboxId, buffer: &mut [u8]) -> Result<usize, MailboxError> {
        self.receive_inner(id, buffer, false, "cond_receive")
    }
}

impl MailboxApi for MailboxEngine {
    fn create(
        &self,
        slot_capacity: usize,
        message_size_limit: usize,
    ) -> Result<MailboxId, MailboxError> {
        let mut section = self.enter("create");
        if message_size_limit > self.max_message {
            return Err(MailboxError::InvalidArgument(format!(
                "message size limit {} exceeds the kernel maximum of {}",
                message_size_limit, self.max_message
            )));
        }
        if slot_capacity > section.slots.capacity() {
            return Err(MailboxError::InvalidArgument(format!(
                "slot capacity {} exceeds the {} slots in the system",
                slot_capacity,
                section.slots.capacity()
            )));
        }

        let id = section.mailboxes.allocate(slot_capacity, message_size_limit)?;
        if self.debug {
            log::debug!(
                "create(): {} with {} slots of up to {} bytes",
                id,
                slot_capacity,
                message_size_limit
            );
        }
        Ok(id)
    }

    fn send(&self, id: MailboxId, data: &[u8]) -> Result<(), MailboxError> {
        self.send_inner(id, data, true, "send")
    }

    fn receive(&self, id: MailboxId, buffer: &mut [u8]) -> Result<usize, MailboxError> {
        self.receive_inner(id, buffer, true, "receive")
    }

    fn release(&self, id: MailboxId) -> Result<(), MailboxError> {
        let mut section = self.enter("release");
        let Tables {
            mailboxes,
            slots,
            procs,
        } = &mut *section;

        let mailbox = mailboxes.lookup_mut(id)?;
        mailbox.released = true;

        let mut woken = 0;
        while let Some(producer) = procs.dequeue(&mut mailbox.producers) {
            procs.wake(producer, WakeOutcome::Released);
            self.scheduler.unblock(producer);
            woken += 1;
        }
        while let Some(consumer) = procs.dequeue(&mut mailbox.consumers) {
            procs.wake(consumer, WakeOutcome::Released);
            self.scheduler.unblock(consumer);
            woken += 1;
        }
        while let Some(slot) = slots.pop_front(&mut mailbox.slots) {
            slots.free(slot);
        }

        if woken == 0 {
            mailboxes.clear(id);
            if self.debug {
                log::debug!("release(): {} released", id);
            }
            return Ok(());
        }

        let pid = self.scheduler.current_pid();
        mailbox.pending_acks = woken;
        mailbox.releaser = Some(pid);
        self.park(procs, pid, BlockStatus::Release, id, &[], 0);
        if self.debug {
            log::debug!("release(): {} waits for {} woken processes on {}", pid, woken, id);
        }
        drop(section);

        self.scheduler.block_current(BlockStatus::Release);

        let mut section = self.enter("release");
        match section.procs.take(pid, &mut []) {
            Ok(WakeOutcome::Released) => Ok(()),
            Ok(outcome) => self.halt(HaltReason::IllegalState {
                operation: "release".to_string(),
                detail: format!("releaser {} resumed with {:?}", pid, outcome),
            }),
            Err(reason) => self.halt(reason),
        }
    }
}
