//! Memory interface for the syscall layer
//!
//! Provides:
//! - Typed user and kernel addresses
//! - The address-space translation trait the validator consults
//!
//! Page directory management itself lives in the VM subsystem.

pub mod address;
pub mod paging;

pub use address::{KernelAddr, UserAddr, PAGE_SIZE, USER_TOP, WORD_SIZE};
pub use paging::{AddressSpace, Mapping, PageFlags};
