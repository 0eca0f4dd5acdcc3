//! User and Kernel Address Types
//!
//! Type-safe wrappers that keep addresses handed in by user code apart
//! from pointers the kernel may actually dereference.
//!
//! # Security Properties
//! - `UserAddr` has no dereference API at all
//! - `KernelAddr` can only be produced by an address-space translation
//! - The user/kernel split is checked before any translation is attempted

use core::fmt;
use core::ptr::NonNull;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;
/// Page size mask
pub const PAGE_MASK: usize = PAGE_SIZE - 1;
/// Bits to shift for page number
pub const PAGE_SHIFT: usize = 12;

/// First address above user space (the kernel lives at and above this).
pub const USER_TOP: usize = 0xC000_0000;

/// Size of one argument word on the user stack.
pub const WORD_SIZE: usize = 4;

/// An address supplied by user code.
///
/// Nothing about this value is trusted: it may be null, point into the
/// kernel half, or name an unmapped page. It has to go through the
/// syscall validator before anything behind it is touched.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct UserAddr(usize);

impl UserAddr {
    /// Null user address.
    pub const NULL: Self = Self(0);

    /// Wrap a raw address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Wrap a 32-bit word read from the user stack.
    #[inline]
    pub const fn from_word(word: u32) -> Self {
        Self(word as usize)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check for the null address.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Check if the address lies in the user half of the address space.
    ///
    /// Null is not a user address.
    #[inline]
    pub const fn is_user(self) -> bool {
        !self.is_null() && self.0 < USER_TOP
    }

    /// Get the page number.
    #[inline]
    pub const fn page_number(self) -> usize {
        self.0 >> PAGE_SHIFT
    }

    /// Get the page offset (lowest 12 bits).
    #[inline]
    pub const fn page_offset(self) -> usize {
        self.0 & PAGE_MASK
    }

    /// Number of bytes from this address to the end of its page.
    #[inline]
    pub const fn bytes_to_page_end(self) -> usize {
        PAGE_SIZE - self.page_offset()
    }

    /// Add an offset, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(self, offset: usize) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }
}

impl fmt::Debug for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserAddr({:#010x})", self.0)
    }
}

impl fmt::Display for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// A kernel-dereferenceable pointer to a byte of user memory.
///
/// Only an [`AddressSpace`](super::AddressSpace) translation hands these
/// out; the translation's safety contract is what makes reading from it
/// sound.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct KernelAddr(NonNull<u8>);

impl KernelAddr {
    /// Wrap a pointer produced by a translation.
    #[inline]
    pub const fn new(ptr: NonNull<u8>) -> Self {
        Self(ptr)
    }

    /// Get the raw pointer.
    #[inline]
    pub const fn as_ptr(self) -> *mut u8 {
        self.0.as_ptr()
    }
}

impl fmt::Debug for KernelAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KernelAddr({:p})", self.0)
    }
}
