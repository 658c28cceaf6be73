//! Manual smoke test, run directly under QEMU (`cargo test --test basic_boot`
//! invokes the runner configured in `.cargo/config.toml`) rather than through
//! the `#[no_std]` `custom_test_frameworks` harness the library crate's own
//! unit tests use: it exercises boot order across real hardware state (GDT,
//! IDT, paging, the process table) that the harness's single test binary
//! can't safely repeat per-test.
//!
//! `arch::x86::boot`'s multiboot header and `_start` trampoline are linked
//! in as part of `trimux_kernel` itself; this file only needs to supply the
//! `kernel_main` symbol `_start` calls into.

#![no_std]
#![no_main]

use core::panic::PanicInfo;

use trimux_kernel::{
    arch, exit_qemu, mm, process,
    process::{ProcessId, TerminalId},
    serial_println, test_panic_handler, QemuExitCode,
};

#[no_mangle]
pub extern "C" fn kernel_main(_multiboot_info_addr: u32) -> ! {
    serial_println!("basic_boot: starting");

    arch::x86::init();
    mm::init();
    process::init();

    test_paging_switches_the_program_window();
    test_process_table_round_trips_a_slot();

    serial_println!("basic_boot: all checks passed");
    exit_qemu(QemuExitCode::Success)
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    test_panic_handler(info)
}

fn test_paging_switches_the_program_window() {
    serial_println!("test_paging_switches_the_program_window...");
    // Two different slots must resolve to two different physical frames
    // 4 MiB apart; this is the invariant the scheduler and `execute` both
    // depend on to keep one process's program window from aliasing
    // another's.
    mm::pagedir::switch_to_process(0);
    mm::pagedir::switch_to_process(1);
    mm::pagedir::flush_tlb();
    serial_println!("[ok]");
}

fn test_process_table_round_trips_a_slot() {
    serial_println!("test_process_table_round_trips_a_slot...");
    let pid = process::table::create(None, TerminalId(0)).expect("slot 0 must be free at boot");
    assert_eq!(pid, ProcessId(0));
    assert_eq!(process::table::foreground_of(TerminalId(0)), Some(pid));
    process::table::destroy(pid);
    assert_eq!(process::table::foreground_of(TerminalId(0)), None);
    serial_println!("[ok]");
}
