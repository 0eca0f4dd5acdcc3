//! Syscall Trap Frame
//!
//! The slice of saved user state the syscall layer reads and writes.
//! The architecture glue saves the full register file; only the user
//! stack pointer and the return register matter here.

use crate::mm::UserAddr;

/// State captured when user code traps into the kernel for a syscall.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrapFrame {
    /// User stack pointer at the time of the trap. Untrusted.
    pub esp: u32,
    /// Return value register.
    pub eax: u32,
}

impl TrapFrame {
    /// Create a frame for a trap with the given user stack pointer.
    pub const fn new(esp: u32) -> Self {
        Self { esp, eax: 0 }
    }

    /// The user stack pointer, unchecked.
    #[inline]
    pub fn stack_pointer(&self) -> UserAddr {
        UserAddr::from_word(self.esp)
    }

    /// Store a syscall return value.
    #[inline]
    pub fn set_return(&mut self, value: i32) {
        self.eax = value as u32;
    }

    /// The stored return value.
    #[inline]
    pub fn return_value(&self) -> i32 {
        self.eax as i32
    }
}

/// What the trap glue does after a syscall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Return to the calling process.
    Resume,
    /// The process was torn down with this status; switch away for good.
    Exited(i32),
    /// The machine was powered off.
    Halted,
}
