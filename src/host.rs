//! Host Services
//!
//! Everything the syscall layer needs from the rest of the kernel that
//! it does not implement itself: the scheduler, the process loader, the
//! console device and power control.

use crate::fs::FileSystem;
use crate::mm::AddressSpace;
use crate::process::{ParentLink, Pid};

/// Collaborator interface implemented by the embedding kernel.
pub trait Host: Sync {
    /// The filesystem behind the gate.
    type Fs: FileSystem;
    /// Per-process address space.
    type Space: AddressSpace;

    /// Create a process running `cmdline`.
    ///
    /// The new execution context owns `parent` and must report its load
    /// result through it. Returns `None` if no context could be created;
    /// dropping `parent` then reports the load as failed.
    fn spawn(&self, cmdline: &str, parent: ParentLink) -> Option<Pid>;

    /// Give up the processor to another runnable context.
    fn yield_now(&self);

    /// Emit bytes on the console as one uninterrupted unit.
    fn console_write(&self, bytes: &[u8]);

    /// Block until one byte of console input is available.
    fn console_read_byte(&self) -> u8;

    /// Power the machine off.
    fn power_off(&self);
}

/// Open-file handle type of a host's filesystem.
pub type FileOf<H> = <<H as Host>::Fs as FileSystem>::File;
