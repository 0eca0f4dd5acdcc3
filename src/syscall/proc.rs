//! Process Syscall Handlers
//!
//! Thin wrappers over the kernel's exec/wait/exit protocol.

use log::info;

use crate::host::Host;
use crate::kernel::Kernel;
use crate::process::{Pid, Process};
use crate::trap::Disposition;

use super::handler::SyscallError;
use super::validate::UserStr;

/// Power the machine off.
pub(super) fn sys_halt<H: Host>(kernel: &Kernel<H>) -> Disposition {
    info!("[SYSCALL] halt: powering off");
    kernel.host().power_off();
    Disposition::Halted
}

/// Terminate the caller with `status`.
pub(super) fn sys_exit<H: Host>(kernel: &Kernel<H>, process: &mut Process<H>, status: i32) -> Disposition {
    kernel.exit(process, status);
    Disposition::Exited(status)
}

/// Start a child from a command line already copied into kernel memory.
pub(super) fn sys_exec<H: Host>(
    kernel: &Kernel<H>,
    process: &mut Process<H>,
    cmdline: &UserStr,
) -> Result<Pid, SyscallError> {
    kernel.exec(process, cmdline.as_str())
}

/// Wait for a child and collect its exit status.
pub(super) fn sys_wait<H: Host>(kernel: &Kernel<H>, process: &mut Process<H>, pid: Pid) -> Result<i32, SyscallError> {
    kernel.wait(process, pid)
}
