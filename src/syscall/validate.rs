//! System Call Input Validation
//!
//! Every user-supplied pointer passes through here before the kernel
//! touches what it points at.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: deny by default
//! - Prevent common vulnerabilities:
//!   - Null pointer dereference (explicit checks)
//!   - Kernel memory disclosure (user/kernel split check)
//!   - Partially mapped buffers (every page of a range is translated)
//!   - TOCTOU races on strings (copied to kernel memory before use)

use alloc::string::String;
use alloc::vec::Vec;
use core::marker::PhantomData;

use crate::mm::{AddressSpace, KernelAddr, Mapping, UserAddr, PAGE_SIZE, USER_TOP, WORD_SIZE};

use super::handler::SyscallError;

/// Length limits for strings copied in from user space.
pub mod limits {
    use crate::mm::PAGE_SIZE;

    /// Longest command line `exec` accepts (NUL excluded).
    pub const MAX_CMDLINE: usize = PAGE_SIZE - 1;
    /// Longest file name the file syscalls accept (NUL excluded).
    pub const MAX_FILENAME: usize = 255;
}

/// The kind of access the kernel is about to perform on user memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

/// Check a single user byte and translate it.
///
/// # Security Checks
/// 1. Address is not null
/// 2. Address is below the user/kernel split
/// 3. The page is mapped, present and user-accessible
/// 4. For writes, the page is writable
fn check(space: &impl AddressSpace, addr: UserAddr, access: Access) -> Result<Mapping, SyscallError> {
    if !addr.is_user() {
        return Err(SyscallError::Efault);
    }

    let mapping = space.translate(addr).ok_or(SyscallError::Efault)?;
    let allowed = match access {
        Access::Read => mapping.user_readable(),
        Access::Write => mapping.user_writable(),
    };
    if !allowed {
        return Err(SyscallError::Efault);
    }

    Ok(mapping)
}

/// Validate a single user address.
///
/// For callers outside the dispatcher that only need a yes/no on one
/// byte, such as a page-fault handler deciding whether a kernel-mode fault
/// came from a user pointer.
pub fn validate(space: &impl AddressSpace, addr: UserAddr) -> Result<(), SyscallError> {
    check(space, addr, Access::Read).map(|_| ())
}

/// A contiguous piece of a validated buffer that lies within one page.
#[derive(Debug, Clone, Copy)]
struct Chunk {
    ptr: KernelAddr,
    len: usize,
}

/// Walk `[base, base + len)` and translate every page it touches.
///
/// Each step advances to the next page boundary, so every byte in the
/// range is covered by exactly one successful translation.
fn collect_chunks(
    space: &impl AddressSpace,
    base: UserAddr,
    len: usize,
    access: Access,
) -> Result<Vec<Chunk>, SyscallError> {
    let mut chunks = Vec::new();

    // Zero-length ranges are never dereferenced
    if len == 0 {
        return Ok(chunks);
    }

    let end = base.as_usize().checked_add(len).ok_or(SyscallError::Efault)?;
    if end > USER_TOP {
        return Err(SyscallError::Efault);
    }

    let mut cursor = base;
    let mut remaining = len;
    while remaining > 0 {
        let mapping = check(space, cursor, access)?;
        let take = remaining.min(cursor.bytes_to_page_end());
        chunks.push(Chunk {
            ptr: mapping.kaddr,
            len: take,
        });
        remaining -= take;
        cursor = UserAddr::new(cursor.as_usize() + take);
    }

    Ok(chunks)
}

/// A validated user-space buffer the kernel may read.
///
/// This type guarantees that:
/// - Every byte of the buffer is in user space
/// - Every page it touches is mapped and user-readable
/// - The length doesn't overflow
///
/// The lifetime ties it to the address space it was validated against.
#[derive(Debug)]
pub struct UserBuffer<'a> {
    chunks: Vec<Chunk>,
    len: usize,
    _space: PhantomData<&'a ()>,
}

impl UserBuffer<'_> {
    /// Length of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check for a zero-length buffer.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over the buffer one page-sized piece at a time.
    pub fn chunks(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.chunks.iter().map(|chunk| {
            // SAFETY:
            // - The chunk was produced by a successful translation
            // - It never extends past the end of its page
            // - AddressSpace guarantees validity while the space is borrowed,
            //   and 'a keeps that borrow alive
            unsafe { core::slice::from_raw_parts(chunk.ptr.as_ptr(), chunk.len) }
        })
    }

    /// Copy the whole buffer into kernel memory.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for piece in self.chunks() {
            out.extend_from_slice(piece);
        }
        out
    }
}

/// A validated mutable user-space buffer.
///
/// Same guarantees as [`UserBuffer`], plus every page is writable.
#[derive(Debug)]
pub struct UserBufferMut<'a> {
    chunks: Vec<Chunk>,
    len: usize,
    _space: PhantomData<&'a ()>,
}

impl UserBufferMut<'_> {
    /// Length of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check for a zero-length buffer.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate mutably over the buffer one page-sized piece at a time.
    pub fn chunks_mut(&mut self) -> impl Iterator<Item = &mut [u8]> + '_ {
        self.chunks.iter_mut().map(|chunk| {
            // SAFETY: Same as UserBuffer::chunks; the pages were checked
            // writable and distinct pages never overlap.
            unsafe { core::slice::from_raw_parts_mut(chunk.ptr.as_ptr(), chunk.len) }
        })
    }
}

/// Validate a user-space read buffer
///
/// # Arguments
/// * `space` - Address space of the calling process
/// * `base` - User-space buffer address
/// * `len` - Buffer length in bytes
///
/// # Returns
/// * `Ok(UserBuffer)` - Validated buffer handle
/// * `Err(SyscallError::Efault)` - Some byte of the range is not accessible
pub fn validate_range<'a, S: AddressSpace>(
    space: &'a S,
    base: UserAddr,
    len: usize,
) -> Result<UserBuffer<'a>, SyscallError> {
    let chunks = collect_chunks(space, base, len, Access::Read)?;
    Ok(UserBuffer {
        chunks,
        len,
        _space: PhantomData,
    })
}

/// Validate a user-space write buffer
///
/// Same as read validation, but every page must also be writable.
pub fn validate_range_mut<'a, S: AddressSpace>(
    space: &'a S,
    base: UserAddr,
    len: usize,
) -> Result<UserBufferMut<'a>, SyscallError> {
    let chunks = collect_chunks(space, base, len, Access::Write)?;
    Ok(UserBufferMut {
        chunks,
        len,
        _space: PhantomData,
    })
}

/// Read one little-endian 32-bit word from user memory.
///
/// All four bytes are validated, so a word straddling into an unmapped
/// page is rejected.
pub fn read_word(space: &impl AddressSpace, addr: UserAddr) -> Result<u32, SyscallError> {
    let buf = validate_range(space, addr, WORD_SIZE)?;
    let mut bytes = [0u8; WORD_SIZE];
    let mut filled = 0;
    for piece in buf.chunks() {
        bytes[filled..filled + piece.len()].copy_from_slice(piece);
        filled += piece.len();
    }
    Ok(u32::from_le_bytes(bytes))
}

/// A NUL-terminated user string copied into kernel memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStr(String);

impl UserStr {
    /// Borrow the copied string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Copy a NUL-terminated string out of user memory.
///
/// # Errors
/// * `Efault` - the string starts at or runs into an inaccessible byte
///   before its terminator (fatal)
/// * `Enametoolong` - no terminator within `max_len` bytes (recoverable)
/// * `Einval` - the bytes are not UTF-8 (recoverable)
pub fn copy_string(
    space: &impl AddressSpace,
    addr: UserAddr,
    max_len: usize,
) -> Result<UserStr, SyscallError> {
    let mut bytes = Vec::new();
    let mut cursor = addr;

    loop {
        let mapping = check(space, cursor, Access::Read)?;
        let avail = cursor.bytes_to_page_end();
        debug_assert!(avail <= PAGE_SIZE);

        // SAFETY: The translation covers the rest of this page.
        let page = unsafe { core::slice::from_raw_parts(mapping.kaddr.as_ptr(), avail) };

        if let Some(nul) = page.iter().position(|&b| b == 0) {
            bytes.extend_from_slice(&page[..nul]);
            break;
        }
        bytes.extend_from_slice(page);

        // Stop before touching further pages once the limit is exceeded
        if bytes.len() > max_len {
            return Err(SyscallError::Enametoolong);
        }
        cursor = cursor.checked_add(avail).ok_or(SyscallError::Efault)?;
    }

    if bytes.len() > max_len {
        return Err(SyscallError::Enametoolong);
    }

    String::from_utf8(bytes)
        .map(UserStr)
        .map_err(|_| SyscallError::Einval)
}
