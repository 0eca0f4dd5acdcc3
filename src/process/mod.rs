//! Per-Process State
//!
//! Each process privately owns its file table and its child registry.
//! The only state shared with another process is the record linking it
//! to its parent.

pub mod children;
pub mod files;

use alloc::string::{String, ToString};
use core::fmt;

use crate::host::{FileOf, Host};

pub use children::{ChildRecord, LoadState, ParentLink, ProcessRegistry};
pub use files::{Fd, FileTable};

/// A process identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Pid(u32);

impl Pid {
    /// Wrap a raw pid.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw pid.
    #[inline]
    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user process as seen by the syscall layer.
pub struct Process<H: Host> {
    pid: Pid,
    name: String,
    alive: bool,
    pub(crate) space: H::Space,
    pub(crate) files: FileTable<FileOf<H>>,
    pub(crate) children: ProcessRegistry,
    pub(crate) parent: Option<ParentLink>,
}

impl<H: Host> Process<H> {
    /// Create the bookkeeping for a process started from `cmdline`.
    ///
    /// The process name is the first word of the command line.
    pub fn new(pid: Pid, cmdline: &str, space: H::Space, parent: Option<ParentLink>) -> Self {
        let name = cmdline.split_whitespace().next().unwrap_or("").to_string();
        Self {
            pid,
            name,
            alive: true,
            space,
            files: FileTable::new(),
            children: ProcessRegistry::new(),
            parent,
        }
    }

    /// Process id.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Program name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check whether the process has not been torn down yet.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub(crate) fn mark_dead(&mut self) {
        self.alive = false;
    }

    /// The process's address space.
    pub fn space(&self) -> &H::Space {
        &self.space
    }

    /// Mutable access to the address space, for the loader.
    pub fn space_mut(&mut self) -> &mut H::Space {
        &mut self.space
    }

    /// Open files.
    pub fn files(&self) -> &FileTable<FileOf<H>> {
        &self.files
    }

    /// Tracked children.
    pub fn children(&self) -> &ProcessRegistry {
        &self.children
    }

    /// Report the result of loading this process's executable to its parent.
    ///
    /// Returns `false` for a process without a parent or if the result was
    /// already reported.
    pub fn report_load(&self, loaded: bool) -> bool {
        match &self.parent {
            Some(link) => link.report_load(loaded),
            None => false,
        }
    }
}

impl<H: Host> fmt::Debug for Process<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("alive", &self.alive)
            .field("files", &self.files.len())
            .field("children", &self.children.len())
            .finish()
    }
}
