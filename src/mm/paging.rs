//! Address Translation Interface
//!
//! The page directory itself belongs to the VM subsystem. The syscall layer
//! only needs one question answered: "is this user byte mapped, with what
//! permissions, and where can the kernel reach it?"
//!
//! # Security Properties
//! - Translation is the only way to obtain a `KernelAddr`
//! - Permission bits travel with every translation so writes into
//!   read-only user pages can be refused

use bitflags::bitflags;

use super::address::{KernelAddr, UserAddr};

bitflags! {
    /// Page permission bits as seen by the syscall layer.
    ///
    /// Bit positions follow the x86 page table entry layout.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PageFlags: u32 {
        /// Page is present in memory.
        const PRESENT = 1 << 0;
        /// Page may be written.
        const WRITABLE = 1 << 1;
        /// Page is reachable from user mode.
        const USER = 1 << 2;

        /// User text: present, user, read-only.
        const USER_CODE = Self::PRESENT.bits() | Self::USER.bits();
        /// User data and stack: present, user, writable.
        const USER_DATA = Self::PRESENT.bits() | Self::USER.bits() | Self::WRITABLE.bits();
    }
}

/// Result of translating one user address.
#[derive(Debug, Clone, Copy)]
pub struct Mapping {
    /// Kernel pointer to the translated byte.
    pub kaddr: KernelAddr,
    /// Permissions of the page containing it.
    pub flags: PageFlags,
}

impl Mapping {
    /// Check if user code could read the page.
    #[inline]
    pub fn user_readable(&self) -> bool {
        self.flags.contains(PageFlags::PRESENT | PageFlags::USER)
    }

    /// Check if user code could write the page.
    #[inline]
    pub fn user_writable(&self) -> bool {
        self.flags.contains(PageFlags::USER_DATA)
    }
}

/// A process address space, as far as the syscall layer is concerned.
///
/// # Safety
/// Implementors guarantee that when `translate(addr)` returns a mapping:
/// - `mapping.kaddr` is valid for reads of every byte from it up to the end
///   of the page containing `addr`, and for writes as well when the page is
///   writable
/// - the memory stays valid while the address space is borrowed
/// - distinct user pages translate to non-overlapping kernel memory
pub unsafe trait AddressSpace {
    /// Look up the page containing `addr`.
    fn translate(&self, addr: UserAddr) -> Option<Mapping>;
}
