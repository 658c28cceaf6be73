//! Kernel boot sequence: bring up the architecture, mount the filesystem
//! image GRUB handed off, then start the first shell on terminal 0.
//!
//! Terminals 1 and 2 start with no foreground process at all; the
//! scheduler (`sched::on_timer_tick`) notices this the first time either
//! terminal's turn comes around and synthesizes a shell for it right then,
//! the same way a halted root shell gets replaced later on.

use crate::{arch, drivers, fs, log_sink, mm, process, sched, terminal};

/// Entry point called from `arch::x86::boot`'s `_start` trampoline (via the
/// production binary's `kernel_main`).
///
/// # Safety
/// `multiboot_info_addr` must be the untouched physical address GRUB left
/// in `ebx` at kernel entry, still mapped and unmodified.
pub unsafe fn run(multiboot_info_addr: u32) -> ! {
    log_sink::init();
    arch::x86::init();

    // SAFETY: forwarded from this function's own contract.
    let image = unsafe { arch::x86::multiboot::find_fs_image(multiboot_info_addr as usize) }
        .expect("no filesystem image module in the multiboot info block");

    fs::init(image.start as *const u8, image.end - image.start);
    mm::init();
    process::init();
    terminal::init();
    drivers::init();
    sched::init();

    println!("trimux kernel");
    log::info!("bootstrap: starting shell on terminal 0");

    // Never returns: `execute` transfers straight into the new shell's
    // ring 3 context, exactly like every later call made by the scheduler
    // or by a halting root shell.
    let _ = process::execute(process::TerminalId(0), None, b"shell");
    unreachable!("process::execute(\"shell\") only returns by blocking on a child");
}
