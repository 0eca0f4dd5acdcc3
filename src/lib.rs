//! usergate - PantherOS Syscall Trust Boundary
//!
//! The layer between a trapped user-mode syscall and the process
//! subsystem of a teaching kernel.
//!
//! # Responsibilities
//! - Validate every user pointer before it is dereferenced
//! - Decode and dispatch the fixed syscall set
//! - Keep per-process file tables and child registries consistent
//! - Run the exec/wait/exit handshake between parent and child
//!
//! # Security Features
//! - Unchecked user addresses and kernel-accessible pointers are distinct
//!   types; handlers only ever see the checked kind
//! - Faulting syscalls kill the caller instead of returning
//! - One global lock in front of the non-reentrant filesystem
//! - Parent/child records are reference counted, so an orphaned child can
//!   never write into freed parent state
//!
//! # Collaborators
//! The scheduler, loader, page directories, filesystem and console are
//! provided by the embedding kernel through [`host::Host`],
//! [`fs::FileSystem`] and [`mm::AddressSpace`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod fs;
pub mod host;
pub mod kernel;
pub mod mm;
pub mod process;
pub mod syscall;
pub mod trap;

#[cfg(test)]
mod testing;

pub use kernel::Kernel;
pub use trap::{Disposition, TrapFrame};
