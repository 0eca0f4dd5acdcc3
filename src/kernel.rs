//! Kernel-Wide Syscall State
//!
//! Holds the filesystem gate and the host services, and implements the
//! process side of the exec/wait/exit protocol.

use alloc::format;
use alloc::sync::Arc;

use log::debug;

use crate::fs::{FileSystem, FsGate};
use crate::host::Host;
use crate::process::{ChildRecord, LoadState, ParentLink, Pid, Process};
use crate::syscall::{self, SyscallError, KILLED_STATUS};
use crate::trap::{Disposition, TrapFrame};

/// State shared by every process's syscall path.
pub struct Kernel<H: Host> {
    host: H,
    fs: FsGate<H::Fs>,
}

impl<H: Host> Kernel<H> {
    /// Create the syscall layer on top of a host and its filesystem.
    pub fn new(host: H, fs: H::Fs) -> Self {
        Self {
            host,
            fs: FsGate::new(fs),
        }
    }

    /// Host services.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The global filesystem gate.
    pub fn fs(&self) -> &FsGate<H::Fs> {
        &self.fs
    }

    /// Syscall entry point, called by the trap glue.
    pub fn handle_syscall(&self, process: &mut Process<H>, frame: &mut TrapFrame) -> Disposition {
        syscall::dispatch(self, process, frame)
    }

    /// Spawn a child and block until it has tried to load.
    ///
    /// # Errors
    /// `Enoexec` if the host cannot create the process or the child
    /// reports a failed load.
    pub fn exec(&self, process: &mut Process<H>, cmdline: &str) -> Result<Pid, SyscallError> {
        let record = Arc::new(ChildRecord::new());
        let link = ParentLink::new(Arc::clone(&record));
        let pid = self.host.spawn(cmdline, link).ok_or(SyscallError::Enoexec)?;
        process.children.register_child(pid, Arc::clone(&record));
        debug!("[PROCESS] pid {} spawned {} ({:?})", process.pid(), pid, cmdline);

        loop {
            match record.load_state() {
                LoadState::NotLoaded => self.host.yield_now(),
                LoadState::Success => return Ok(pid),
                LoadState::Failed => {
                    // Nobody can wait on a pid exec never returned
                    process.children.retire(pid);
                    debug!("[PROCESS] pid {} failed to load", pid);
                    return Err(SyscallError::Enoexec);
                }
            }
        }
    }

    /// Block until child `pid` terminates and collect its status.
    ///
    /// # Errors
    /// `Echild` without blocking if `pid` is not a child of `process` or
    /// has already been waited for.
    pub fn wait(&self, process: &mut Process<H>, pid: Pid) -> Result<i32, SyscallError> {
        let record = process.children.claim_wait(pid).ok_or(SyscallError::Echild)?;
        while !record.has_exited() {
            self.host.yield_now();
        }

        let status = record.exit_status().unwrap_or(KILLED_STATUS);
        process.children.retire(pid);
        debug!("[PROCESS] pid {} reaped {} with status {}", process.pid(), pid, status);
        Ok(status)
    }

    /// Tear a process down.
    ///
    /// Prints the exit message, releases every open file and child
    /// record, then hands `status` to the parent if it is still alive.
    /// Calling this on a process that is already gone does nothing.
    pub fn exit(&self, process: &mut Process<H>, status: i32) {
        if !process.is_alive() {
            return;
        }
        process.mark_dead();

        let message = format!("{}: exit({})\n", process.name(), status);
        self.host.console_write(message.as_bytes());

        let files = process.files.close_all();
        let closed = files.len();
        if !files.is_empty() {
            let mut fs = self.fs.lock();
            for file in files {
                fs.close(file);
            }
        }
        let retired = process.children.retire_all();

        debug!(
            "[PROCESS] pid {} exit({}): closed {} files, released {} child records",
            process.pid(),
            status,
            closed,
            retired
        );

        // Last, so a parent woken by this sees a fully torn-down child
        if let Some(link) = process.parent.take() {
            link.finish(status);
        }
    }
}
