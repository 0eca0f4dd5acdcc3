//! File Syscall Handlers
//!
//! Every handler here receives already-validated arguments. Disk-backed
//! descriptors are only touched while the filesystem gate is held; the
//! console descriptors bypass it.

use log::debug;

use crate::fs::FileSystem;
use crate::host::{FileOf, Host};
use crate::kernel::Kernel;
use crate::process::{Fd, FileTable};

use super::handler::{ret_len, SyscallError};
use super::validate::{UserBuffer, UserBufferMut, UserStr};

/// Create a file of the given initial size.
pub(super) fn sys_create<H: Host>(kernel: &Kernel<H>, name: &UserStr, initial_size: u32) -> bool {
    let mut fs = kernel.fs().lock();
    fs.create(name.as_str(), initial_size)
}

/// Remove a file by name.
///
/// Handles already open on it stay usable; that is the filesystem's
/// deferred-delete contract.
pub(super) fn sys_remove<H: Host>(kernel: &Kernel<H>, name: &UserStr) -> bool {
    let mut fs = kernel.fs().lock();
    fs.remove(name.as_str())
}

/// Open a file and give it the next descriptor.
pub(super) fn sys_open<H: Host>(
    kernel: &Kernel<H>,
    files: &mut FileTable<FileOf<H>>,
    name: &UserStr,
) -> Result<Fd, SyscallError> {
    let mut fs = kernel.fs().lock();
    let handle = fs.open(name.as_str()).ok_or(SyscallError::Enoent)?;
    match files.add(handle) {
        Ok(fd) => {
            debug!("[FS] open {:?} -> fd {}", name.as_str(), fd);
            Ok(fd)
        }
        Err(handle) => {
            fs.close(handle);
            Err(SyscallError::Emfile)
        }
    }
}

/// Length of the file behind `fd`.
pub(super) fn sys_filesize<H: Host>(
    kernel: &Kernel<H>,
    files: &mut FileTable<FileOf<H>>,
    fd: Fd,
) -> Result<i32, SyscallError> {
    let mut fs = kernel.fs().lock();
    let handle = files.get(fd).ok_or(SyscallError::Ebadf)?;
    ret_len(fs.length(handle))
}

/// Read into a validated user buffer.
///
/// Descriptor 0 pulls exactly `buf.len()` bytes from the console, one
/// at a time.
pub(super) fn sys_read<H: Host>(
    kernel: &Kernel<H>,
    files: &mut FileTable<FileOf<H>>,
    fd: Fd,
    buf: &mut UserBufferMut<'_>,
) -> Result<i32, SyscallError> {
    if fd == Fd::STDIN {
        for piece in buf.chunks_mut() {
            for byte in piece.iter_mut() {
                *byte = kernel.host().console_read_byte();
            }
        }
        return ret_len(buf.len());
    }

    let mut fs = kernel.fs().lock();
    let handle = files.get(fd).ok_or(SyscallError::Ebadf)?;
    let mut total = 0;
    for piece in buf.chunks_mut() {
        let n = fs.read(handle, piece);
        total += n;
        if n < piece.len() {
            break;
        }
    }
    ret_len(total)
}

/// Write from a validated user buffer.
///
/// Descriptor 1 hands the whole buffer to the console in one call so
/// concurrent writers cannot interleave inside it.
pub(super) fn sys_write<H: Host>(
    kernel: &Kernel<H>,
    files: &mut FileTable<FileOf<H>>,
    fd: Fd,
    buf: &UserBuffer<'_>,
) -> Result<i32, SyscallError> {
    if fd == Fd::STDOUT {
        kernel.host().console_write(&buf.to_vec());
        return ret_len(buf.len());
    }

    let mut fs = kernel.fs().lock();
    let handle = files.get(fd).ok_or(SyscallError::Ebadf)?;
    let mut total = 0;
    for piece in buf.chunks() {
        let n = fs.write(handle, piece);
        total += n;
        if n < piece.len() {
            break;
        }
    }
    ret_len(total)
}

/// Move the file offset; unknown descriptors are ignored.
pub(super) fn sys_seek<H: Host>(kernel: &Kernel<H>, files: &mut FileTable<FileOf<H>>, fd: Fd, position: u32) {
    let mut fs = kernel.fs().lock();
    if let Some(handle) = files.get(fd) {
        fs.seek(handle, position);
    }
}

/// Current file offset.
pub(super) fn sys_tell<H: Host>(
    kernel: &Kernel<H>,
    files: &mut FileTable<FileOf<H>>,
    fd: Fd,
) -> Result<i32, SyscallError> {
    let mut fs = kernel.fs().lock();
    let handle = files.get(fd).ok_or(SyscallError::Ebadf)?;
    ret_len(fs.tell(handle))
}

/// Close one descriptor; unknown descriptors are ignored.
pub(super) fn sys_close<H: Host>(kernel: &Kernel<H>, files: &mut FileTable<FileOf<H>>, fd: Fd) {
    let mut fs = kernel.fs().lock();
    if let Some(handle) = files.close(fd) {
        fs.close(handle);
    }
}
