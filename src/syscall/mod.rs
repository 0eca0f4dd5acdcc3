//! System Call Interface
//!
//! Provides the syscall boundary between user processes and the kernel.
//!
//! # Security Model
//! - Whitelist approach: only explicitly implemented syscalls are allowed
//! - All parameters are validated before use, by the dispatcher
//! - Invalid pointers kill the caller; other failures return -1
//!
//! # Syscalls
//! - 0: halt()
//! - 1: exit(status)
//! - 2: exec(cmdline)
//! - 3: wait(pid)
//! - 4: create(file, initial_size)
//! - 5: remove(file)
//! - 6: open(file)
//! - 7: filesize(fd)
//! - 8: read(fd, buf, len)
//! - 9: write(fd, buf, len)
//! - 10: seek(fd, position)
//! - 11: tell(fd)
//! - 12: close(fd)

mod file;
mod handler;
mod proc;
pub mod validate;


pub use handler::{dispatch, numbers, SyscallError, KILLED_STATUS, MAX_TRANSFER, SYSCALL_ERROR};
pub use validate::{UserBuffer, UserBufferMut, UserStr};
