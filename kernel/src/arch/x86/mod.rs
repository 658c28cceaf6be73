//! IA-32 protected-mode architecture support: GDT/TSS, IDT, the 8259 PIC,
//! the 8253 PIT, VGA text output, the 16550 serial port, and multiboot2
//! boot-info parsing.

pub mod boot;
pub mod context;
pub mod gdt;
pub mod idt;
pub mod multiboot;
pub mod pic;
pub mod pit;
pub mod serial;
pub mod vga;

use x86::halt as cpu_halt;

/// Bring the CPU up from real/protected mode hand-off to a state where the
/// rest of kernel init can run: GDT, IDT, PIC remap, PIT rate, then enable
/// interrupts.
pub fn init() {
    serial::init();
    gdt::init();
    idt::init();
    pic::init();
    pit::init();

    // SAFETY: the IDT and PIC are fully programmed by this point, so it is
    // safe to start taking interrupts.
    unsafe {
        x86::irq::enable();
    }

    log::info!("arch: GDT/IDT/PIC/PIT initialized, interrupts enabled");
}

/// Halt the CPU until the next interrupt. Used by the idle path and by the
/// panic handler.
pub fn halt() -> ! {
    loop {
        // SAFETY: `hlt` with interrupts enabled is always safe; it just
        // parks the CPU until the next interrupt fires.
        unsafe {
            cpu_halt();
        }
    }
}
