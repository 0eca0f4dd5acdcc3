//! System Call Dispatcher
//!
//! Decodes one trapped syscall, validates its arguments and runs the
//! matching handler.
//!
//! # Security Considerations
//! - The stack pointer and every argument word are validated before reading
//! - Pointer arguments are validated here, never inside handlers
//! - Unknown syscall numbers terminate the caller
//! - Fatal validation errors never reach user code as return values

use core::fmt;

use log::{debug, warn};

use crate::host::Host;
use crate::kernel::Kernel;
use crate::mm::{AddressSpace, UserAddr, WORD_SIZE};
use crate::process::{Fd, Pid, Process};
use crate::trap::{Disposition, TrapFrame};

use super::validate::{self, limits};
use super::{file, proc};

/// System call numbers
pub mod numbers {
    pub const SYS_HALT: u32 = 0;
    pub const SYS_EXIT: u32 = 1;
    pub const SYS_EXEC: u32 = 2;
    pub const SYS_WAIT: u32 = 3;
    pub const SYS_CREATE: u32 = 4;
    pub const SYS_REMOVE: u32 = 5;
    pub const SYS_OPEN: u32 = 6;
    pub const SYS_FILESIZE: u32 = 7;
    pub const SYS_READ: u32 = 8;
    pub const SYS_WRITE: u32 = 9;
    pub const SYS_SEEK: u32 = 10;
    pub const SYS_TELL: u32 = 11;
    pub const SYS_CLOSE: u32 = 12;
}

/// Value returned to user code when a syscall fails.
pub const SYSCALL_ERROR: i32 = -1;

/// Exit status of a process killed by the syscall layer.
pub const KILLED_STATUS: i32 = -1;

/// Largest byte count one read or write transfers, so the count always
/// fits the return register.
pub const MAX_TRANSFER: usize = i32::MAX as usize;

/// System call error codes
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    /// No such file
    Enoent = -2,
    /// Executable could not be loaded
    Enoexec = -8,
    /// Bad file descriptor
    Ebadf = -9,
    /// Not a waitable child
    Echild = -10,
    /// Bad address (invalid pointer)
    Efault = -14,
    /// Invalid argument
    Einval = -22,
    /// Descriptor space exhausted
    Emfile = -24,
    /// String argument too long
    Enametoolong = -36,
    /// Invalid system call number
    Enosys = -38,
    /// Value does not fit the return register
    Eoverflow = -75,
}

impl SyscallError {
    /// Check if this error kills the calling process.
    ///
    /// A violated pointer contract or a bogus syscall number leaves
    /// nothing meaningful to return to.
    #[inline]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Efault | Self::Enosys)
    }
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enoent => write!(f, "no such file"),
            Self::Enoexec => write!(f, "executable failed to load"),
            Self::Ebadf => write!(f, "bad file descriptor"),
            Self::Echild => write!(f, "not a waitable child"),
            Self::Efault => write!(f, "bad user address"),
            Self::Einval => write!(f, "invalid argument"),
            Self::Emfile => write!(f, "too many open files"),
            Self::Enametoolong => write!(f, "name too long"),
            Self::Enosys => write!(f, "unknown system call"),
            Self::Eoverflow => write!(f, "value too large for return register"),
        }
    }
}

/// Argument words on the trapped user stack.
///
/// Argument `i` lives one word above argument `i - 1`, with the syscall
/// number at the stack pointer itself.
struct Args<'a, S> {
    space: &'a S,
    esp: UserAddr,
}

impl<S: AddressSpace> Args<'_, S> {
    fn word(&self, index: usize) -> Result<u32, SyscallError> {
        let offset = (index + 1) * WORD_SIZE;
        let addr = self.esp.checked_add(offset).ok_or(SyscallError::Efault)?;
        validate::read_word(self.space, addr)
    }

    fn int(&self, index: usize) -> Result<i32, SyscallError> {
        self.word(index).map(|w| w as i32)
    }

    fn addr(&self, index: usize) -> Result<UserAddr, SyscallError> {
        self.word(index).map(UserAddr::from_word)
    }

    fn fd(&self, index: usize) -> Result<Fd, SyscallError> {
        self.int(index).map(Fd::from_raw)
    }

    /// A transfer length, capped at `MAX_TRANSFER`.
    fn len(&self, index: usize) -> Result<usize, SyscallError> {
        self.word(index).map(|w| (w as usize).min(MAX_TRANSFER))
    }
}

/// Store a handler result in the frame.
///
/// Recoverable errors become `SYSCALL_ERROR`; fatal ones propagate so the
/// caller gets terminated.
fn finish(frame: &mut TrapFrame, result: Result<i32, SyscallError>) -> Result<Disposition, SyscallError> {
    match result {
        Ok(value) => frame.set_return(value),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            debug!("[SYSCALL] returning error: {}", e);
            frame.set_return(SYSCALL_ERROR);
        }
    }
    Ok(Disposition::Resume)
}

/// Dispatch a system call
///
/// # Arguments
/// * `kernel` - Kernel-wide state (filesystem gate, host services)
/// * `process` - The calling process
/// * `frame` - Trap frame with the user stack pointer and return slot
///
/// # Returns
/// What the trap glue should do next: resume the caller, or switch away
/// from a process that has already been torn down.
pub fn dispatch<H: Host>(kernel: &Kernel<H>, process: &mut Process<H>, frame: &mut TrapFrame) -> Disposition {
    match decode_and_run(kernel, process, frame) {
        Ok(disposition) => disposition,
        Err(e) => {
            warn!(
                "[SYSCALL] pid {}: {} (esp={}); terminating",
                process.pid(),
                e,
                frame.stack_pointer()
            );
            kernel.exit(process, KILLED_STATUS);
            Disposition::Exited(KILLED_STATUS)
        }
    }
}

fn decode_and_run<H: Host>(
    kernel: &Kernel<H>,
    process: &mut Process<H>,
    frame: &mut TrapFrame,
) -> Result<Disposition, SyscallError> {
    let esp = frame.stack_pointer();
    let syscall_num = validate::read_word(&process.space, esp)?;
    let args = Args {
        space: &process.space,
        esp,
    };

    #[cfg(feature = "syscall_debug")]
    log::trace!("[SYSCALL] pid {}: syscall {}", process.pid(), syscall_num);

    match syscall_num {
        numbers::SYS_HALT => Ok(proc::sys_halt(kernel)),
        numbers::SYS_EXIT => {
            let status = args.int(0)?;
            Ok(proc::sys_exit(kernel, process, status))
        }
        numbers::SYS_EXEC => {
            let cmdline = validate::copy_string(args.space, args.addr(0)?, limits::MAX_CMDLINE);
            let result = cmdline.and_then(|cmdline| proc::sys_exec(kernel, process, &cmdline));
            finish(frame, result.map(|pid| pid.as_raw() as i32))
        }
        numbers::SYS_WAIT => {
            let pid = args.int(0)?;
            let result = match u32::try_from(pid) {
                Ok(raw) => proc::sys_wait(kernel, process, Pid::from_raw(raw)),
                Err(_) => Err(SyscallError::Echild),
            };
            finish(frame, result)
        }
        numbers::SYS_CREATE => {
            let name = validate::copy_string(args.space, args.addr(0)?, limits::MAX_FILENAME);
            let size = args.word(1)?;
            let result = name.map(|name| file::sys_create(kernel, &name, size));
            finish(frame, recover_bool(result))
        }
        numbers::SYS_REMOVE => {
            let name = validate::copy_string(args.space, args.addr(0)?, limits::MAX_FILENAME);
            let result = name.map(|name| file::sys_remove(kernel, &name));
            finish(frame, recover_bool(result))
        }
        numbers::SYS_OPEN => {
            let name = validate::copy_string(args.space, args.addr(0)?, limits::MAX_FILENAME);
            let result = name.and_then(|name| file::sys_open(kernel, &mut process.files, &name));
            finish(frame, result.map(Fd::as_raw))
        }
        numbers::SYS_FILESIZE => {
            let fd = args.fd(0)?;
            finish(frame, file::sys_filesize(kernel, &mut process.files, fd))
        }
        numbers::SYS_READ => {
            let fd = args.fd(0)?;
            let base = args.addr(1)?;
            let len = args.len(2)?;
            let mut buf = validate::validate_range_mut(&process.space, base, len)?;
            finish(frame, file::sys_read(kernel, &mut process.files, fd, &mut buf))
        }
        numbers::SYS_WRITE => {
            let fd = args.fd(0)?;
            let base = args.addr(1)?;
            let len = args.len(2)?;
            let buf = validate::validate_range(&process.space, base, len)?;
            finish(frame, file::sys_write(kernel, &mut process.files, fd, &buf))
        }
        numbers::SYS_SEEK => {
            let fd = args.fd(0)?;
            let position = args.word(1)?;
            file::sys_seek(kernel, &mut process.files, fd, position);
            Ok(Disposition::Resume)
        }
        numbers::SYS_TELL => {
            let fd = args.fd(0)?;
            finish(frame, file::sys_tell(kernel, &mut process.files, fd))
        }
        numbers::SYS_CLOSE => {
            let fd = args.fd(0)?;
            file::sys_close(kernel, &mut process.files, fd);
            Ok(Disposition::Resume)
        }
        _ => {
            warn!("[SYSCALL] pid {}: unknown syscall {}", process.pid(), syscall_num);
            Err(SyscallError::Enosys)
        }
    }
}

/// Fold a recoverable string error into a `false` return for the
/// boolean syscalls; fatal errors still propagate.
fn recover_bool(result: Result<bool, SyscallError>) -> Result<i32, SyscallError> {
    match result {
        Ok(success) => Ok(success as i32),
        Err(e) if e.is_fatal() => Err(e),
        Err(_) => Ok(0),
    }
}

/// Convert a byte count or file offset into a return value.
///
/// Values past `i32::MAX` would alias `SYSCALL_ERROR` and friends, so they
/// are reported as `Eoverflow` instead.
pub(super) fn ret_len<T: TryInto<i32>>(value: T) -> Result<i32, SyscallError> {
    value.try_into().map_err(|_| SyscallError::Eoverflow)
}
