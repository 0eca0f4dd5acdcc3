//! Per-Process File Table
//!
//! Maps descriptors to open file handles for one process.
//!
//! # Design
//! - Descriptors 0 and 1 are the console and never allocated
//! - Allocation is monotonic: a closed descriptor is never handed out again
//! - Entries are kept in descriptor order

use alloc::vec::Vec;
use core::fmt;

/// A process-local file descriptor.
///
/// This is a newtype to keep raw integers from user space apart from
/// descriptors the table actually handed out.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Fd(i32);

impl Fd {
    /// Console input.
    pub const STDIN: Self = Self(0);
    /// Console output.
    pub const STDOUT: Self = Self(1);
    /// First descriptor available for files.
    pub const FIRST_FILE: Self = Self(2);

    /// Wrap a raw descriptor value.
    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Get the raw descriptor value.
    #[inline]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One open file.
#[derive(Debug)]
struct OpenFile<F> {
    fd: Fd,
    handle: F,
}

/// File table of one process.
#[derive(Debug)]
pub struct FileTable<F> {
    entries: Vec<OpenFile<F>>,
    next: Option<Fd>,
}

impl<F> FileTable<F> {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next: Some(Fd::FIRST_FILE),
        }
    }

    /// Insert a handle under the next descriptor.
    ///
    /// Gives the handle back if the descriptor space is used up.
    pub fn add(&mut self, handle: F) -> Result<Fd, F> {
        let Some(fd) = self.next else {
            return Err(handle);
        };
        self.next = fd.0.checked_add(1).map(Fd);
        self.entries.push(OpenFile { fd, handle });
        Ok(fd)
    }

    /// Look up the handle behind a descriptor.
    pub fn get(&mut self, fd: Fd) -> Option<&mut F> {
        self.entries
            .iter_mut()
            .find(|entry| entry.fd == fd)
            .map(|entry| &mut entry.handle)
    }

    /// Check whether a descriptor is open.
    pub fn contains(&self, fd: Fd) -> bool {
        self.entries.iter().any(|entry| entry.fd == fd)
    }

    /// Remove one descriptor, handing its file back for release.
    pub fn close(&mut self, fd: Fd) -> Option<F> {
        let index = self.entries.iter().position(|entry| entry.fd == fd)?;
        Some(self.entries.remove(index).handle)
    }

    /// Remove every descriptor. Used once, at process teardown.
    pub fn close_all(&mut self) -> Vec<F> {
        self.entries.drain(..).map(|entry| entry.handle).collect()
    }

    /// Number of open descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no descriptors are open.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F> Default for FileTable<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_descriptors() {
        let mut table = FileTable::new();
        let fd = table.add("a").unwrap();
        assert_eq!(fd, Fd::FIRST_FILE);
        assert!(table.get(Fd::STDIN).is_none());
        assert!(table.get(Fd::STDOUT).is_none());
    }

    #[test]
    fn test_never_reused() {
        let mut table = FileTable::new();
        let a = table.add("a").unwrap();
        let b = table.add("b").unwrap();
        assert_eq!(table.close(b), Some("b"));
        assert_eq!(table.close(a), Some("a"));

        let c = table.add("c").unwrap();
        assert!(c > b);
        assert!(table.get(a).is_none());
        assert!(table.get(b).is_none());
        assert_eq!(table.get(c), Some(&mut "c"));
    }

    #[test]
    fn test_double_close() {
        let mut table = FileTable::new();
        let fd = table.add(7u32).unwrap();
        assert_eq!(table.close(fd), Some(7));
        assert_eq!(table.close(fd), None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_close_all() {
        let mut table = FileTable::new();
        for i in 0..5 {
            table.add(i).unwrap();
        }
        let closed = table.close_all();
        assert_eq!(closed, [0, 1, 2, 3, 4]);
        assert!(table.is_empty());
        assert!(table.close_all().is_empty());
    }

    #[test]
    fn test_descriptor_exhaustion() {
        let mut table = FileTable::new();
        table.next = Some(Fd(i32::MAX));
        assert_eq!(table.add("last"), Ok(Fd(i32::MAX)));
        assert_eq!(table.add("one too many"), Err("one too many"));
    }
}
