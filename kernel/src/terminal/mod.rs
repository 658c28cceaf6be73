//! Per-terminal line discipline and console output.
//!
//! Three terminals, each with its own 128-byte input line buffer, its own
//! VGA [`Writer`](crate::arch::x86::vga::Writer) (pointed at the real
//! framebuffer when displayed, at a backup page otherwise), and its own
//! cursor. Alt+F1/F2/F3 swap which terminal is *displayed*; that is
//! independent of which terminal the scheduler is currently *running*
//! (see `sched`).

use spin::Mutex;

use crate::{
    arch::x86::vga::{self, Buffer, Writer},
    mm::layout::{MAX_TERMINALS, VGA_PHYS_ADDR, VIDEO_BACKUP_PHYS},
    process::TerminalId,
};

pub const LINE_BUFFER_LEN: usize = 128;

struct TerminalState {
    line: [u8; LINE_BUFFER_LEN],
    line_len: usize,
    line_ready: bool,
    writer: Writer,
}

impl TerminalState {
    const fn new(buffer: *mut Buffer, is_onscreen: bool) -> Self {
        Self {
            line: [0; LINE_BUFFER_LEN],
            line_len: 0,
            line_ready: false,
            writer: Writer::new(buffer, is_onscreen),
        }
    }
}

// SAFETY: `TerminalState` is only ever touched behind `TERMINALS`'s
// per-slot `Mutex`, and this kernel has no SMP.
unsafe impl Send for TerminalState {}

static TERMINALS: [Mutex<Option<TerminalState>>; MAX_TERMINALS] =
    [const { Mutex::new(None) }; MAX_TERMINALS];

static DISPLAYED: Mutex<usize> = Mutex::new(0);

pub fn init() {
    for (i, slot) in TERMINALS.iter().enumerate() {
        let buffer = if i == 0 {
            VGA_PHYS_ADDR as *mut Buffer
        } else {
            VIDEO_BACKUP_PHYS[i] as *mut Buffer
        };
        *slot.lock() = Some(TerminalState::new(buffer, i == 0));
    }
    *DISPLAYED.lock() = 0;
}

pub fn displayed() -> TerminalId {
    TerminalId(*DISPLAYED.lock() as u8)
}

/// Cooperative display switch (Alt+F1/F2/F3): swap the real framebuffer
/// contents with the target terminal's backup page and retarget both
/// writers. Does not touch scheduling.
pub fn switch_display(target: TerminalId) {
    let target = target.0 as usize;
    let mut current = DISPLAYED.lock();
    if *current == target {
        return;
    }

    // Save the real framebuffer into the outgoing terminal's backup page,
    // then copy the incoming terminal's backup page onto the framebuffer.
    // SAFETY: both addresses are 4 KiB-aligned, kernel-mapped pages.
    unsafe {
        crate::mm::pagedir::copy_video_page(VIDEO_BACKUP_PHYS[*current], VGA_PHYS_ADDR);
        crate::mm::pagedir::copy_video_page(VGA_PHYS_ADDR, VIDEO_BACKUP_PHYS[target]);
    }

    if let Some(state) = TERMINALS[*current].lock().as_mut() {
        state.writer.retarget(VIDEO_BACKUP_PHYS[*current] as *mut Buffer, false);
    }
    if let Some(state) = TERMINALS[target].lock().as_mut() {
        state.writer.retarget(VGA_PHYS_ADDR as *mut Buffer, true);
    }

    *current = target;
}

/// The video buffer physical address a process on `terminal` should see
/// through its `vidmap` window: the real framebuffer if it is displayed,
/// its backup page otherwise.
pub fn video_phys_for(terminal: TerminalId) -> u32 {
    if displayed() == terminal {
        VGA_PHYS_ADDR
    } else {
        VIDEO_BACKUP_PHYS[terminal.0 as usize]
    }
}

/// Console output used by `print!`/`println!` before any process-level
/// terminal context exists (boot banner): always goes to terminal 0.
pub fn _print(args: core::fmt::Arguments) {
    write_to(TerminalId(0), args);
}

/// Print a kernel diagnostic (e.g. `execute`'s process-limit message) to a
/// specific terminal, independent of whichever one `print!` would reach.
pub fn print_to(terminal: TerminalId, args: core::fmt::Arguments) {
    write_to(terminal, args);
}

fn write_to(terminal: TerminalId, args: core::fmt::Arguments) {
    use core::fmt::Write;
    if let Some(state) = TERMINALS[terminal.0 as usize].lock().as_mut() {
        state.writer.write_fmt(args).ok();
    }
}

/// Feed one decoded character into `terminal`'s line buffer. Called from
/// `drivers::keyboard`. Backspace and Enter are handled here; printable
/// characters are both echoed to the screen and appended to the buffer.
pub fn on_key(terminal: TerminalId, ch: char) {
    let idx = terminal.0 as usize;
    let mut guard = TERMINALS[idx].lock();
    let Some(state) = guard.as_mut() else { return };

    match ch {
        '\u{8}' => {
            if state.line_len > 0 {
                state.line_len -= 1;
                use core::fmt::Write;
                state.writer.write_char('\u{8}').ok();
            }
        }
        '\n' => {
            if state.line_len < LINE_BUFFER_LEN {
                state.line[state.line_len] = b'\n';
                state.line_len += 1;
            } else {
                state.line[LINE_BUFFER_LEN - 1] = b'\n';
            }
            use core::fmt::Write;
            state.writer.write_char('\n').ok();
            state.line_ready = true;
        }
        ch if state.line_len < LINE_BUFFER_LEN && ch.is_ascii() => {
            state.line[state.line_len] = ch as u8;
            state.line_len += 1;
            use core::fmt::Write;
            state.writer.write_char(ch).ok();
        }
        _ => {}
    }
}

/// Clear the screen (Ctrl+L).
pub fn clear(terminal: TerminalId) {
    let idx = terminal.0 as usize;
    if let Some(state) = TERMINALS[idx].lock().as_mut() {
        state.writer.clear_screen();
        state.line_len = 0;
        state.line_ready = false;
    }
}

/// `read` syscall on a terminal descriptor: busy-wait for a completed
/// line, then copy up to `buf.len()` bytes into `buf`, always forcing the
/// last copied byte to `\n` (matching the line discipline's contract that
/// every `terminal_read` ends on a newline even if the caller's buffer is
/// shorter than the line).
pub fn read(terminal: TerminalId, buf: &mut [u8]) -> usize {
    let idx = terminal.0 as usize;
    // Every IDT gate in this kernel clears IF on entry, including the
    // `int 0x80` gate this runs under, so without re-enabling interrupts
    // here the keyboard ISR that would ever set `line_ready` could never
    // fire and this would spin forever.
    unsafe {
        x86::irq::enable();
    }
    loop {
        {
            let mut guard = TERMINALS[idx].lock();
            if let Some(state) = guard.as_mut() {
                if state.line_ready {
                    let n = buf.len().min(state.line_len);
                    buf[..n].copy_from_slice(&state.line[..n]);
                    if n > 0 {
                        buf[n - 1] = b'\n';
                    }
                    state.line_len = 0;
                    state.line_ready = false;
                    unsafe {
                        x86::irq::disable();
                    }
                    return n;
                }
            }
        }
        core::hint::spin_loop();
    }
}

/// `write` syscall on a terminal descriptor. Embedded NUL bytes are
/// silently skipped rather than sent to the screen; the full requested
/// length is still reported back to the caller.
pub fn write(terminal: TerminalId, buf: &[u8]) -> usize {
    let idx = terminal.0 as usize;
    let mut guard = TERMINALS[idx].lock();
    if let Some(state) = guard.as_mut() {
        use core::fmt::Write;
        for &byte in buf {
            if byte == 0 {
                continue;
            }
            state.writer.write_char(byte as char).ok();
        }
    }
    buf.len()
}

pub use vga::Color;
