//! The eight live syscall handlers. Each one validates its user-space
//! pointers (see `super::validate_user_*`) before touching anything the
//! calling process handed it, then dispatches onto the subsystem that
//! actually owns the behavior -- `process`, `fs::descriptor`, `terminal`,
//! `mm::pagedir`. Every failure path here returns `-1`; only a CPU fault
//! (handled entirely separately, in `exceptions`) produces the `256`
//! sentinel.

use super::{current_pid, validate_user_cstr, validate_user_slice, validate_user_slice_mut};
use crate::{
    error::{KernelError, ProcessError},
    fs::image::NAME_LENGTH_MAX,
    mm::layout,
    process::{self, table},
    terminal,
};

/// Cap on the combined filename + argument text `execute` will look at.
const MAX_COMMAND_LEN: usize = 128;

/// Non-negative value `execute` returns when it refuses to start a new
/// process only because the global or per-terminal process ceiling is
/// already hit -- a "try again later" the calling shell should treat as
/// benign, distinct from the `-1` it returns for an unexecutable command.
const PROG_LIMIT_REACHED: i32 = 1;

pub fn halt(status: u8) -> i32 {
    let Some(pid) = current_pid() else { return -1 };
    process::halt_current(pid, status as u32)
}

pub fn execute(command_ptr: u32) -> i32 {
    // SAFETY: the slice is read and copied before any paging or process
    // state changes, so nothing in `process::execute` observes stale data.
    let Some(command) = (unsafe { validate_user_cstr(command_ptr, MAX_COMMAND_LEN) }) else {
        return -1;
    };
    let Some(pid) = current_pid() else { return -1 };
    let Some(terminal_id) = table::with(pid, |p| p.terminal) else { return -1 };

    match process::execute(terminal_id, Some(pid), command) {
        Ok(status) => status as i32,
        Err(KernelError::Process(ProcessError::TableFull | ProcessError::TerminalFull)) => PROG_LIMIT_REACHED,
        Err(_) => -1,
    }
}

pub fn read(fd: i32, buf_ptr: u32, nbytes: u32) -> i32 {
    let Some(pid) = current_pid() else { return -1 };
    // SAFETY: validated against the calling process's own mapped window
    // immediately before use, and not retained past this call.
    let Some(buf) = (unsafe { validate_user_slice_mut(buf_ptr, nbytes) }) else {
        return -1;
    };
    match table::with_mut(pid, |p| p.fds.read(fd, buf)) {
        Some(Ok(n)) => n as i32,
        _ => -1,
    }
}

pub fn write(fd: i32, buf_ptr: u32, nbytes: u32) -> i32 {
    let Some(pid) = current_pid() else { return -1 };
    // SAFETY: see `read`.
    let Some(buf) = (unsafe { validate_user_slice(buf_ptr, nbytes) }) else {
        return -1;
    };
    match table::with_mut(pid, |p| p.fds.write(fd, buf)) {
        Some(Ok(n)) => n as i32,
        _ => -1,
    }
}

pub fn open(name_ptr: u32) -> i32 {
    // SAFETY: see `execute`.
    let Some(name) = (unsafe { validate_user_cstr(name_ptr, NAME_LENGTH_MAX) }) else {
        return -1;
    };
    let Some(pid) = current_pid() else { return -1 };
    match table::with_mut(pid, |p| p.fds.open(name)) {
        Some(Ok(fd)) => fd,
        _ => -1,
    }
}

pub fn close(fd: i32) -> i32 {
    let Some(pid) = current_pid() else { return -1 };
    match table::with_mut(pid, |p| p.fds.close(fd)) {
        Some(true) => 0,
        _ => -1,
    }
}

pub fn getargs(buf_ptr: u32, nbytes: u32) -> i32 {
    let Some(pid) = current_pid() else { return -1 };
    let Some((args, args_len)) = table::with(pid, |p| (p.args, p.args_len)) else {
        return -1;
    };
    if args_len == 0 {
        return -1;
    }
    // The copied string must include a terminating NUL within the
    // caller's buffer.
    if args_len as u32 + 1 > nbytes {
        return -1;
    }
    // SAFETY: see `execute`.
    let Some(buf) = (unsafe { validate_user_slice_mut(buf_ptr, nbytes) }) else {
        return -1;
    };
    buf[..args_len].copy_from_slice(&args[..args_len]);
    buf[args_len] = 0;
    0
}

pub fn vidmap(screen_start_ptr: u32) -> i32 {
    let Some(pid) = current_pid() else { return -1 };
    let Some(terminal_id) = table::with(pid, |p| p.terminal) else { return -1 };
    // SAFETY: see `execute`; 4 bytes for the `u32` pointer value written
    // back to the caller.
    let Some(out) = (unsafe { validate_user_slice_mut(screen_start_ptr, 4) }) else {
        return -1;
    };

    table::with_mut(pid, |p| p.video_mapped = true);
    crate::mm::pagedir::enable_user_video_page(terminal::video_phys_for(terminal_id));

    out.copy_from_slice(&layout::USER_VIDEO_VADDR.to_le_bytes());
    0
}
