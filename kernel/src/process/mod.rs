//! Process control: the fixed 6-slot process table, program loading, and
//! the `execute`/`halt` pair that drives it.
//!
//! There is no `fork`, no signals, and no dynamic thread creation in this
//! kernel -- every process is a single flow of control started by
//! `execute` and ended by `halt`. `execute` appears to its caller to block
//! until the child it launches exits, returning the child's exit status,
//! even though the actual mechanism is a one-shot continuation
//! (`arch::x86::context::park_and_wait`/`resume_with_status`) rather than a
//! blocked kernel thread.

pub mod pcb;
pub mod table;

pub use pcb::{ProcessId, TerminalId};

use crate::{
    arch::x86::{context, gdt},
    error::{KernelResult, ProcessError},
    fs, mm,
};

pub fn init() {
    table::init();
}

/// Load and run `command`'s named program as a new process on `terminal`,
/// with `parent` (if any) as the process that will regain the foreground
/// when it halts. Blocks (via [`context::park_and_wait`]) until that
/// happens, then returns its exit status.
pub fn execute(terminal: TerminalId, parent: Option<ProcessId>, command: &[u8]) -> KernelResult<u32> {
    let (filename, name_len, args, args_len) = fs::image::parse_command(command);
    let dentry = fs::descriptor::dentry_for_execute(&filename[..name_len]).ok_or(ProcessError::NotExecutable)?;
    if !fs::image::check_validity(&dentry) {
        return Err(ProcessError::NotExecutable.into());
    }

    let pid = table::create(parent, terminal).map_err(|e| {
        // Resource exhaustion (as opposed to a bad filename) is the one
        // `execute` failure the caller is expected to retry, so it gets a
        // diagnostic printed where the user can see it rather than just a
        // silent `-1`; see `syscall::handlers::execute`'s sentinel mapping.
        if matches!(
            e,
            crate::error::KernelError::Process(ProcessError::TableFull | ProcessError::TerminalFull)
        ) {
            crate::terminal::print_to(terminal, format_args!("FAIL: cannot execute more tasks right now\n"));
        }
        e
    })?;
    let slot = table::with(pid, |p| p.slot).unwrap();
    table::with_mut(pid, |p| p.set_args(&args[..args_len]));

    mm::pagedir::switch_to_process(slot);

    // SAFETY: `switch_to_process` just remapped the user PDE to this
    // process's freshly allocated physical page; `USER_PROG_VADDR` is
    // within it and the slice length is the remainder of that page.
    let dest = unsafe {
        core::slice::from_raw_parts_mut(
            mm::layout::USER_PROG_VADDR as *mut u8,
            (mm::layout::USER_PAGE_VADDR + mm::layout::USER_PAGE_SIZE - mm::layout::USER_PROG_VADDR) as usize,
        )
    };
    let entry = fs::image::program_loader(&dentry, dest);

    gdt::set_kernel_stack(table::with(pid, |p| p.kernel_stack_top).unwrap());
    table::set_current(Some(pid));

    let mut resume_ctx = context::SavedContext::default();
    // SAFETY: called directly inside `execute`, the frame whose apparent
    // return value should carry the child's eventual exit status.
    let resumed = unsafe { context::park_and_wait(&mut resume_ctx) };
    if let Some(status) = resumed {
        return Ok(status);
    }

    table::with_mut(pid, |p| p.resume_ctx = resume_ctx);

    // SAFETY: `entry` was read from the freshly validated, freshly loaded
    // executable's header; the user stack top is always mapped (this
    // process's page was just switched in above).
    unsafe {
        context::enter_user_mode(
            entry,
            gdt::USER_CODE_SELECTOR.bits(),
            mm::layout::USER_STACK_TOP,
            gdt::USER_DATA_SELECTOR.bits(),
        )
    }
}

/// Terminate the current process with `status`, handing control back to
/// whichever `execute` call launched it. Never returns.
///
/// If `pid` was its terminal's root shell (no parent), there is nothing
/// meaningful to resume into: instead of unwinding, a replacement shell is
/// tail-called on the same terminal, so a terminal never goes shell-less.
pub fn halt_current(pid: ProcessId, status: u32) -> ! {
    let ctx = table::with(pid, |p| p.resume_ctx).expect("halt_current: unknown pid");
    let parent = table::with(pid, |p| p.parent).flatten();
    let terminal = table::with(pid, |p| p.terminal).expect("halt_current: unknown pid");
    let video_mapped = table::with(pid, |p| p.video_mapped).expect("halt_current: unknown pid");
    table::destroy(pid);

    if video_mapped {
        mm::pagedir::disable_user_video_page();
    }

    let Some(parent_pid) = parent else {
        table::set_current(None);
        // `ctx` is abandoned here: its caller (whatever spawned this root
        // shell, `bootstrap` or a previous respawn) never needs to observe
        // this halt, since a fresh shell immediately takes this terminal's
        // place instead.
        let _ = execute(terminal, None, b"shell");
        unreachable!("execute(\"shell\") only returns by blocking on a child, never directly");
    };

    let slot = table::with(parent_pid, |p| p.slot).unwrap();
    mm::pagedir::switch_to_process(slot);
    gdt::set_kernel_stack(table::with(parent_pid, |p| p.kernel_stack_top).unwrap());
    table::set_current(Some(parent_pid));

    // SAFETY: `ctx` was parked by the `execute` call that created `pid` and
    // has not been resumed before; `pid` has just been removed from the
    // table so it cannot be resumed twice.
    unsafe { context::resume_with_status(ctx, status) }
}

pub fn current_pid() -> Option<ProcessId> {
    table::current()
}
