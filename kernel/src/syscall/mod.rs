//! `int 0x80` system call dispatch.
//!
//! The ABI matches the one the executables in the filesystem image are
//! linked against: call number in `eax`, up to three arguments in
//! `ebx`/`ecx`/`edx`, return value in `eax` as a signed 32-bit integer.
//! Every argument that is itself a user-space pointer is bounds-checked
//! against the calling process's fixed 4 MiB program window (or its
//! one-page `vidmap` window) before it is ever dereferenced; an
//! out-of-range pointer yields `-1` rather than a page fault.

mod handlers;

use crate::{mm::layout, process};

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Halt = 1,
    Execute = 2,
    Read = 3,
    Write = 4,
    Open = 5,
    Close = 6,
    GetArgs = 7,
    VidMap = 8,
    SetHandler = 9,
    SigReturn = 10,
}

impl TryFrom<u32> for Syscall {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, ()> {
        Ok(match value {
            1 => Self::Halt,
            2 => Self::Execute,
            3 => Self::Read,
            4 => Self::Write,
            5 => Self::Open,
            6 => Self::Close,
            7 => Self::GetArgs,
            8 => Self::VidMap,
            9 => Self::SetHandler,
            10 => Self::SigReturn,
            _ => return Err(()),
        })
    }
}

/// Called from the `int 0x80` trampoline in `arch::x86::idt` with the raw
/// register values. Returns the value to place back in `eax`.
pub fn dispatch(eax: u32, ebx: u32, ecx: u32, edx: u32) -> i32 {
    let Ok(call) = Syscall::try_from(eax) else {
        return -1;
    };

    match call {
        Syscall::Halt => handlers::halt(ebx as u8),
        Syscall::Execute => handlers::execute(ebx),
        Syscall::Read => handlers::read(ebx as i32, ecx, edx),
        Syscall::Write => handlers::write(ebx as i32, ecx, edx),
        Syscall::Open => handlers::open(ebx),
        Syscall::Close => handlers::close(ebx as i32),
        Syscall::GetArgs => handlers::getargs(ebx, ecx),
        Syscall::VidMap => handlers::vidmap(ebx),
        // Signal handling is out of scope for this kernel; both calls
        // always fail, matching a process built against a libc that
        // expects them to exist but never succeed.
        Syscall::SetHandler | Syscall::SigReturn => -1,
    }
}

/// The current process's fixed program window, `[USER_PROG_VADDR,
/// USER_PAGE_VADDR + USER_PAGE_SIZE)`, as validated addresses can only ever
/// fall inside it (the loader never places anything below
/// `USER_PROG_VADDR`, but user code is free to pass pointers anywhere in
/// its own page, e.g. into its own stack).
fn user_window() -> (u32, u32) {
    (layout::USER_PAGE_VADDR, layout::USER_PAGE_VADDR + layout::USER_PAGE_SIZE)
}

/// Validate that `[ptr, ptr+len)` lies entirely within the current
/// process's mapped program page, returning a slice over it if so.
///
/// # Safety
/// Relies on the invariant that the currently scheduled process's page
/// directory entry really does map its claimed 4 MiB physical page at
/// `USER_PAGE_VADDR` (true for any process with an assigned slot, which is
/// the only kind that can be running when a syscall fires).
unsafe fn validate_user_slice<'a>(ptr: u32, len: u32) -> Option<&'a [u8]> {
    let (lo, hi) = user_window();
    let end = ptr.checked_add(len)?;
    if ptr < lo || end > hi {
        return None;
    }
    // SAFETY: forwarded from this function's contract; range checked above.
    Some(unsafe { core::slice::from_raw_parts(ptr as *const u8, len as usize) })
}

unsafe fn validate_user_slice_mut<'a>(ptr: u32, len: u32) -> Option<&'a mut [u8]> {
    let (lo, hi) = user_window();
    let end = ptr.checked_add(len)?;
    if ptr < lo || end > hi {
        return None;
    }
    // SAFETY: forwarded from this function's contract; range checked above.
    Some(unsafe { core::slice::from_raw_parts_mut(ptr as *mut u8, len as usize) })
}

/// Validate a NUL-or-newline-terminated user string (a filename or command
/// line), capped at `max_len`, returning the byte slice up to but not
/// including the terminator.
///
/// # Safety
/// Same contract as [`validate_user_slice`].
unsafe fn validate_user_cstr<'a>(ptr: u32, max_len: usize) -> Option<&'a [u8]> {
    let (lo, hi) = user_window();
    if ptr < lo || ptr >= hi {
        return None;
    }
    let available = (hi - ptr) as usize;
    let cap = max_len.min(available);
    // SAFETY: `ptr` is within the mapped window and `cap` bytes past it
    // remain within that same window.
    let probe = unsafe { core::slice::from_raw_parts(ptr as *const u8, cap) };
    let len = probe.iter().position(|&b| b == 0 || b == b'\n').unwrap_or(cap);
    Some(&probe[..len])
}

fn current_pid() -> Option<process::ProcessId> {
    process::current_pid()
}
