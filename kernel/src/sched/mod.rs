//! Round-robin terminal scheduler.
//!
//! There is no per-thread priority, no run queue, and no SMP here: the
//! unit of scheduling is a terminal, not a process. Every PIT tick, the
//! *scheduled* terminal (the one actually holding the CPU) advances by one,
//! wrapping after the third; whichever process is currently in the
//! foreground of that terminal gets the next time slice. An empty
//! terminal is handed a freshly spawned shell rather than skipped.
//!
//! This is independent of the *displayed* terminal (`crate::terminal`,
//! switched by Alt+F1/F2/F3): a terminal can be running in the background
//! while another is on screen, exactly as the three-terminal design calls
//! for.
//!
//! Preemption reuses the same parked-frame trick as `process::execute` /
//! `process::halt_current` (see `arch::x86::context`), scoped one level up:
//! a process that is about to lose the CPU has its current kernel frame
//! parked into its own PCB, to be resumed verbatim the next time this
//! terminal's turn comes around.

use spin::Mutex;

use crate::{
    arch::x86::{context, gdt},
    mm,
    process::{self, table, TerminalId},
};

static SCHEDULED: Mutex<usize> = Mutex::new(0);

pub fn init() {
    *SCHEDULED.lock() = 0;
}

/// The terminal currently holding the CPU (as opposed to the one on
/// screen).
pub fn scheduled() -> TerminalId {
    TerminalId(*SCHEDULED.lock() as u8)
}

/// Called from the timer ISR on every PIT tick, after EOI has already been
/// sent (see `arch::x86::idt::timer_handler` for why the ordering
/// matters). Parks whatever is currently running, advances to the next
/// terminal, and transfers control to it.
pub fn on_timer_tick() {
    let prev = *SCHEDULED.lock();
    let next = (prev + 1) % mm::MAX_TERMINALS;

    if let Some(prev_pid) = table::foreground_of(TerminalId(prev as u8)) {
        let mut ctx = context::SavedContext::default();
        // SAFETY: called directly here, the resume point this parks is
        // exactly "return from `on_timer_tick`", which is what should
        // happen the next time this terminal's process regains the CPU.
        let resumed = unsafe { context::park_and_wait(&mut ctx) };
        if resumed.is_some() {
            // A later tick resumed this exact parked frame: nothing left
            // to do, let this call unwind back into `timer_handler`'s
            // epilogue, which `iret`s into wherever this process was
            // interrupted.
            return;
        }
        table::with_mut(prev_pid, |p| p.sched_ctx = Some(ctx));
    }

    *SCHEDULED.lock() = next;
    transfer_to(TerminalId(next as u8));
}

fn transfer_to(terminal: TerminalId) {
    let Some(pid) = table::foreground_of(terminal) else {
        // Empty terminal: synthesize a shell. `process::execute` never
        // returns here -- it transfers into the new shell's ring 3 context
        // directly.
        let _ = process::execute(terminal, None, b"shell");
        return;
    };

    let Some(slot) = table::with(pid, |p| p.slot) else { return };
    mm::pagedir::switch_to_process(slot);
    gdt::set_kernel_stack(table::with(pid, |p| p.kernel_stack_top).unwrap());
    table::set_current(Some(pid));

    let video_mapped = table::with(pid, |p| p.video_mapped).unwrap_or(false);
    if video_mapped {
        mm::pagedir::enable_user_video_page(crate::terminal::video_phys_for(terminal));
    } else {
        mm::pagedir::disable_user_video_page();
    }

    let sched_ctx = table::with(pid, |p| p.sched_ctx).flatten();
    match sched_ctx {
        // SAFETY: `ctx` was parked by an earlier `on_timer_tick` call for
        // this exact pid and has not been resumed since.
        Some(ctx) => unsafe { context::resume_with_status(ctx, 0) },
        None => {
            // A terminal's foreground process can only reach here without
            // ever having been parked if it was scheduled in without ever
            // first losing the CPU, which round-robin rotation over three
            // terminals never does in steady state (every terminal is
            // "prev" once per full rotation before it can be "next"
            // again). Treat it as a missed tick rather than fault.
            log::warn!("sched: terminal {} has no parked context, skipping this tick", terminal.0);
        }
    }
}
