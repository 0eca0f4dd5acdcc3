//! Filesystem Gate
//!
//! The backing filesystem is not reentrant, so every call into it goes
//! through one global lock.
//!
//! # Design
//! - `FileSystem` is the byte-stream interface the syscall layer consumes
//! - File operations take `&mut self` on the filesystem, so the only way
//!   to reach them is through the gate's guard
//! - The guard releases the lock on every exit path, early returns included

use spin::{Mutex, MutexGuard};

/// Byte-stream filesystem primitives.
///
/// Offsets and sizes are 32-bit, matching the syscall ABI.
pub trait FileSystem {
    /// An open file. Owned by exactly one descriptor-table entry.
    type File;

    /// Create an empty file of `initial_size` bytes.
    fn create(&mut self, name: &str, initial_size: u32) -> bool;

    /// Remove a file by name.
    fn remove(&mut self, name: &str) -> bool;

    /// Open a file by name.
    fn open(&mut self, name: &str) -> Option<Self::File>;

    /// Read at the current offset; returns bytes read.
    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> usize;

    /// Write at the current offset; returns bytes written.
    fn write(&mut self, file: &mut Self::File, buf: &[u8]) -> usize;

    /// File length in bytes.
    fn length(&mut self, file: &Self::File) -> u32;

    /// Set the current offset.
    fn seek(&mut self, file: &mut Self::File, position: u32);

    /// Get the current offset.
    fn tell(&mut self, file: &Self::File) -> u32;

    /// Release an open file. Consumes the handle, so it can only happen once.
    fn close(&mut self, file: Self::File);
}

/// The global filesystem lock together with the filesystem it guards.
pub struct FsGate<F> {
    fs: Mutex<F>,
}

impl<F: FileSystem> FsGate<F> {
    /// Wrap a filesystem.
    pub const fn new(fs: F) -> Self {
        Self { fs: Mutex::new(fs) }
    }

    /// Acquire the filesystem lock.
    pub fn lock(&self) -> MutexGuard<'_, F> {
        self.fs.lock()
    }

    /// Check whether some context currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.fs.is_locked()
    }
}
