//! Simulated process scheduler
//!
//! Each simulated process is an OS thread. Parking a process parks its
//! thread on a condition variable; unblocking flips its state and wakes
//! the waiters.
//!
//! ## Philosophy
//!
//! - **Mechanism, not policy**: Whoever is runnable runs. There is no run
//!   queue and no priority; the host OS picks the thread.
//! - **No lost wake-ups**: An `unblock` that arrives before its target has
//!   parked is kept as a wake permit and consumed by the next park.
//! - **Auditable**: Every park, wake and time slice is appended to an event
//!   log that tests can inspect.
//!
//! Threads that were not spawned through [`SimScheduler::spawn`] are
//! registered as processes the first time they ask for their pid, so a
//! test's own thread can call blocking operations directly.
//!
//! ## Pid assignment
//!
//! The mailbox layer keys its block table by `pid % max_processes`. Pids
//! keep increasing, but a candidate whose entry is held by a process that
//! has not exited is skipped, so no two live processes ever share an
//! entry. Once every entry is held, spawning fails.

use core_types::limits::MAX_PROCESSES;
use core_types::ProcessId;
use kernel_api::{BlockStatus, ProcessScheduler};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

/// Process state in the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    /// Process is running or ready to run
    Runnable,
    /// Process is parked in the mailbox layer
    Blocked { status: BlockStatus },
    /// Process body returned (or panicked)
    Exited,
}

/// Scheduling event for audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleEvent {
    /// Process was registered
    Registered { pid: ProcessId, name: String },
    /// Process parked
    Blocked { pid: ProcessId, status: BlockStatus },
    /// Parked process was made runnable, or a wake permit was left for it
    Unblocked { pid: ProcessId },
    /// Clock interrupt accounted to the current process
    TimeSlice { pid: Option<ProcessId> },
    /// Process body finished
    Exited { pid: ProcessId },
}

#[derive(Debug)]
struct ProcessEntry {
    name: String,
    state: ProcessState,
    wake_permit: bool,
}

#[derive(Debug)]
struct SchedulerState {
    processes: BTreeMap<ProcessId, ProcessEntry>,
    threads: HashMap<ThreadId, ProcessId>,
    process_limit: usize,
    next_pid: u32,
    time_slices: u64,
    events: Vec<ScheduleEvent>,
}

impl SchedulerState {
    fn new(process_limit: usize) -> Self {
        Self {
            processes: BTreeMap::new(),
            threads: HashMap::new(),
            process_limit: process_limit.max(1),
            next_pid: 0,
            time_slices: 0,
            events: Vec::new(),
        }
    }

    /// Whether a process that has not exited maps to `index`
    fn entry_in_use(&self, index: usize) -> bool {
        self.processes.iter().any(|(pid, entry)| {
            entry.state != ProcessState::Exited && pid.table_index(self.process_limit) == index
        })
    }

    /// Issues the next pid whose block table entry is free
    fn allocate(&mut self, name: String) -> Option<ProcessId> {
        for _ in 0..self.process_limit {
            self.next_pid = self.next_pid.checked_add(1).unwrap_or(1);
            let pid = ProcessId::new(self.next_pid);
            if self.entry_in_use(pid.table_index(self.process_limit)) {
                continue;
            }
            self.events.push(ScheduleEvent::Registered {
                pid,
                name: name.clone(),
            });
            self.processes.insert(
                pid,
                ProcessEntry {
                    name,
                    state: ProcessState::Runnable,
                    wake_permit: false,
                },
            );
            return Some(pid);
        }
        None
    }

    fn exit(&mut self, pid: ProcessId) {
        if let Some(entry) = self.processes.get_mut(&pid) {
            entry.state = ProcessState::Exited;
            entry.wake_permit = false;
        }
        self.threads.retain(|_, owner| *owner != pid);
        self.events.push(ScheduleEvent::Exited { pid });
    }
}

/// A spawned simulated process
#[derive(Debug)]
pub struct ProcessHandle<T> {
    pid: ProcessId,
    thread: JoinHandle<T>,
}

impl<T> ProcessHandle<T> {
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Waits for the process body to return
    ///
    /// Returns `Err` with the panic payload if the process panicked, which
    /// includes halting the machine.
    pub fn join(self) -> thread::Result<T> {
        self.thread.join()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

/// Thread-backed scheduler
#[derive(Debug)]
pub struct SimScheduler {
    state: Mutex<SchedulerState>,
    wakeup: Condvar,
}

impl Default for SimScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl SimScheduler {
    /// Creates a scheduler sized for the default block table
    pub fn new() -> Self {
        Self::with_process_limit(MAX_PROCESSES)
    }

    /// Creates a scheduler for a block table of `process_limit` entries
    pub fn with_process_limit(process_limit: usize) -> Self {
        Self {
            state: Mutex::new(SchedulerState::new(process_limit)),
            wakeup: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers the calling thread as a process
    ///
    /// Returns the existing pid if the thread is already registered.
    ///
    /// # Panics
    ///
    /// Panics if every block table entry is held by a live process.
    pub fn register_current(&self, name: &str) -> ProcessId {
        let thread = thread::current().id();
        let mut state = self.lock();
        if let Some(pid) = state.threads.get(&thread) {
            return *pid;
        }
        match state.allocate(name.to_string()) {
            Some(pid) => {
                state.threads.insert(thread, pid);
                pid
            }
            None => panic!(
                "process table full: {} live processes",
                state.process_limit
            ),
        }
    }

    /// Starts a simulated process running `body`
    ///
    /// The pid is issued before the thread starts. Fails with
    /// [`ErrorKind::WouldBlock`](io::ErrorKind::WouldBlock) when every block
    /// table entry is held by a live process.
    pub fn spawn<F, T>(self: &Arc<Self>, name: &str, body: F) -> io::Result<ProcessHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let pid = {
            let mut state = self.lock();
            state.allocate(name.to_string()).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::WouldBlock,
                    format!("process table full: {} live processes", state.process_limit),
                )
            })?
        };

        let scheduler = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _exit = ExitGuard {
                    scheduler: &scheduler,
                    pid,
                };
                scheduler.lock().threads.insert(thread::current().id(), pid);
                body()
            });
        let thread = match spawned {
            Ok(thread) => thread,
            Err(err) => {
                self.lock().exit(pid);
                return Err(err);
            }
        };

        log::debug!("spawned {} as {}", name, pid);
        Ok(ProcessHandle { pid, thread })
    }

    /// Current state of a process
    pub fn state(&self, pid: ProcessId) -> Option<ProcessState> {
        self.lock().processes.get(&pid).map(|entry| entry.state)
    }

    pub fn is_blocked(&self, pid: ProcessId) -> bool {
        matches!(self.state(pid), Some(ProcessState::Blocked { .. }))
    }

    /// Number of processes currently parked
    pub fn blocked_count(&self) -> usize {
        self.lock()
            .processes
            .values()
            .filter(|entry| matches!(entry.state, ProcessState::Blocked { .. }))
            .count()
    }

    /// Name a process was registered under
    pub fn name(&self, pid: ProcessId) -> Option<String> {
        self.lock().processes.get(&pid).map(|entry| entry.name.clone())
    }

    /// Clock interrupts seen so far
    pub fn time_slices(&self) -> u64 {
        self.lock().time_slices
    }

    /// Copy of the audit trail
    pub fn events(&self) -> Vec<ScheduleEvent> {
        self.lock().events.clone()
    }

    fn exit(&self, pid: ProcessId) {
        self.lock().exit(pid);
    }
}

/// Marks a spawned process exited even when its body panics
struct ExitGuard<'a> {
    scheduler: &'a SimScheduler,
    pid: ProcessId,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.exit(self.pid);
    }
}

impl ProcessScheduler for SimScheduler {
    fn current_pid(&self) -> ProcessId {
        let thread = thread::current();
        let name = thread.name().unwrap_or("unnamed").to_string();
        self.register_current(&name)
    }

    fn block_current(&self, status: BlockStatus) {
        let pid = self.current_pid();
        let mut state = self.lock();
        let Some(entry) = state.processes.get_mut(&pid) else {
            return;
        };
        if entry.wake_permit {
            entry.wake_permit = false;
            return;
        }
        entry.state = ProcessState::Blocked { status };
        state.events.push(ScheduleEvent::Blocked { pid, status });

        let mut state = self
            .wakeup
            .wait_while(state, |state| {
                matches!(
                    state.processes.get(&pid).map(|entry| entry.state),
                    Some(ProcessState::Blocked { .. })
                )
            })
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = state.processes.get_mut(&pid) {
            entry.wake_permit = false;
        }
    }

    fn unblock(&self, pid: ProcessId) {
        let mut state = self.lock();
        let Some(entry) = state.processes.get_mut(&pid) else {
            log::warn!("unblock of unknown {}", pid);
            return;
        };
        match entry.state {
            ProcessState::Blocked { .. } => entry.state = ProcessState::Runnable,
            ProcessState::Runnable => entry.wake_permit = true,
            ProcessState::Exited => return,
        }
        state.events.push(ScheduleEvent::Unblocked { pid });
        drop(state);
        self.wakeup.notify_all();
    }

    fn time_slice(&self) {
        let current = thread::current().id();
        let mut state = self.lock();
        state.time_slices += 1;
        let pid = state.threads.get(&current).copied();
        state.events.push(ScheduleEvent::TimeSlice { pid });
    }
}
