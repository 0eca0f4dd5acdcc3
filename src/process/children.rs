//! Child Process Registry
//!
//! Bookkeeping behind the exec/wait/exit handshake.
//!
//! # Record Lifecycle
//! ```text
//!   parent (exec)                     child context
//!   ─────────────                     ─────────────
//!   ChildRecord::new()
//!   spawn(cmdline, ParentLink) ───►   owns ParentLink
//!   register_child(pid, record)
//!   spin on load_state  ◄────────     report_load(Success | Failed)
//!   ...
//!   wait: claim_wait(pid)
//!   spin on has_exited  ◄────────     finish(status)   (skipped write if
//!   retire(pid)                                         parent is gone)
//! ```
//!
//! # Synchronization
//! - Load state is a single atomic written once by the child
//! - Exit status, the exit flag and the parent-alive flag share one lock,
//!   so a child's "is my parent alive, then write" and the parent's
//!   "I am gone" can never interleave
//! - Both sides hold an `Arc`, so neither can touch freed memory

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU8, Ordering};

use spin::Mutex;

use super::Pid;

/// Whether a freshly spawned child has loaded its executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoadState {
    /// The child has not finished loading.
    NotLoaded = 0,
    /// The executable loaded.
    Success = 1,
    /// The executable failed to load.
    Failed = 2,
}

impl LoadState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => LoadState::Success,
            2 => LoadState::Failed,
            _ => LoadState::NotLoaded,
        }
    }
}

/// Exit-side state, guarded by the record lock.
#[derive(Debug)]
struct ExitState {
    parent_alive: bool,
    exited: bool,
    status: Option<i32>,
}

/// Shared state between a parent and one child.
#[derive(Debug)]
pub struct ChildRecord {
    load: AtomicU8,
    exit: Mutex<ExitState>,
}

impl ChildRecord {
    /// Create a record in the `NotLoaded` state.
    pub fn new() -> Self {
        Self {
            load: AtomicU8::new(LoadState::NotLoaded as u8),
            exit: Mutex::new(ExitState {
                parent_alive: true,
                exited: false,
                status: None,
            }),
        }
    }

    /// Current load state.
    pub fn load_state(&self) -> LoadState {
        LoadState::from_raw(self.load.load(Ordering::Acquire))
    }

    /// Move out of `NotLoaded`. Only the first transition takes effect.
    fn set_load_state(&self, state: LoadState) -> bool {
        debug_assert!(state != LoadState::NotLoaded);
        self.load
            .compare_exchange(
                LoadState::NotLoaded as u8,
                state as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Check whether the child has terminated.
    pub fn has_exited(&self) -> bool {
        self.exit.lock().exited
    }

    /// Exit status, if the child has terminated and recorded one.
    pub fn exit_status(&self) -> Option<i32> {
        let state = self.exit.lock();
        if state.exited {
            state.status
        } else {
            None
        }
    }

    /// Check whether the parent still owns this record.
    pub fn parent_alive(&self) -> bool {
        self.exit.lock().parent_alive
    }

    /// Child side of termination. Idempotent.
    fn finish(&self, status: Option<i32>) {
        // A child that dies before reporting never loaded
        self.set_load_state(LoadState::Failed);

        let mut state = self.exit.lock();
        if state.exited {
            return;
        }
        if state.parent_alive {
            state.status = status;
        }
        state.exited = true;
    }

    /// Parent side of teardown.
    fn orphan(&self) {
        self.exit.lock().parent_alive = false;
    }
}

impl Default for ChildRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// The child's handle on its record in the parent's registry.
///
/// Dropping the link without calling [`ParentLink::finish`] still marks
/// the child as exited (with no status), so a waiting parent never hangs.
#[derive(Debug)]
pub struct ParentLink {
    record: Arc<ChildRecord>,
}

impl ParentLink {
    pub(crate) fn new(record: Arc<ChildRecord>) -> Self {
        Self { record }
    }

    /// Report the load result. Returns `false` if it was already reported.
    pub fn report_load(&self, loaded: bool) -> bool {
        let state = if loaded {
            LoadState::Success
        } else {
            LoadState::Failed
        };
        self.record.set_load_state(state)
    }

    /// Check whether the parent is still around to read an exit status.
    pub fn parent_alive(&self) -> bool {
        self.record.parent_alive()
    }

    /// Record termination with `status`.
    pub(crate) fn finish(self, status: i32) {
        self.record.finish(Some(status));
    }
}

impl Drop for ParentLink {
    fn drop(&mut self) {
        self.record.finish(None);
    }
}

/// One child known to the parent.
#[derive(Debug)]
struct ChildEntry {
    pid: Pid,
    record: Arc<ChildRecord>,
    wait_consumed: bool,
}

/// Children of one process.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    children: Vec<ChildEntry>,
}

impl ProcessRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            children: Vec::new(),
        }
    }

    /// Add a freshly spawned child.
    pub fn register_child(&mut self, pid: Pid, record: Arc<ChildRecord>) {
        self.children.push(ChildEntry {
            pid,
            record,
            wait_consumed: false,
        });
    }

    /// Look up one of this process's children.
    ///
    /// Read-only; for the host's process listing and debugger. The wait
    /// path goes through [`claim_wait`](Self::claim_wait).
    pub fn find_child(&self, pid: Pid) -> Option<&Arc<ChildRecord>> {
        self.children
            .iter()
            .find(|entry| entry.pid == pid)
            .map(|entry| &entry.record)
    }

    /// Mark a child as being waited on.
    ///
    /// Returns `None` if `pid` is not a child or was already claimed.
    pub fn claim_wait(&mut self, pid: Pid) -> Option<Arc<ChildRecord>> {
        let entry = self.children.iter_mut().find(|entry| entry.pid == pid)?;
        if entry.wait_consumed {
            return None;
        }
        entry.wait_consumed = true;
        Some(Arc::clone(&entry.record))
    }

    /// Drop one record. Returns `false` if it was not there.
    pub fn retire(&mut self, pid: Pid) -> bool {
        match self.children.iter().position(|entry| entry.pid == pid) {
            Some(index) => {
                self.children.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drop every record at teardown. The children keep running.
    ///
    /// Returns the number of records released.
    pub fn retire_all(&mut self) -> usize {
        let count = self.children.len();
        for entry in self.children.drain(..) {
            entry.record.orphan();
        }
        count
    }

    /// Number of children still tracked.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Check if no children are tracked.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
