//! 8259 Programmable Interrupt Controller: remap both PICs so IRQ0-7 land
//! on vectors 32-39 and IRQ8-15 on 40-47 (clear of the CPU exception
//! range), then mask everything except the timer, keyboard, and RTC lines
//! this kernel actually services.

use pic8259::ChainedPics;
use spin::Mutex;

const PIC1_OFFSET: u8 = 32;
const PIC2_OFFSET: u8 = 40;

pub const IRQ_TIMER: u8 = 0;
pub const IRQ_KEYBOARD: u8 = 1;
pub const IRQ_RTC: u8 = 8;

static PICS: Mutex<ChainedPics> =
    Mutex::new(unsafe { ChainedPics::new(PIC1_OFFSET, PIC2_OFFSET) });

pub fn init() {
    // SAFETY: called exactly once during boot, before interrupts are
    // enabled, with the correct offsets chosen to avoid the CPU exception
    // range.
    unsafe {
        PICS.lock().initialize();
    }
    mask_all();
    enable_irq(IRQ_TIMER);
    enable_irq(IRQ_KEYBOARD);
    enable_irq(IRQ_RTC);
}

fn mask_all() {
    // SAFETY: raw port writes to the PIC mask registers; values are the
    // documented "mask everything" pattern.
    unsafe {
        x86::io::outb(0x21, 0xFF);
        x86::io::outb(0xA1, 0xFF);
    }
}

pub fn enable_irq(irq: u8) {
    let port = if irq < 8 { 0x21 } else { 0xA1 };
    let bit = if irq < 8 { irq } else { irq - 8 };
    // SAFETY: `port` is one of the two documented 8259 mask I/O ports.
    unsafe {
        let mask = x86::io::inb(port);
        x86::io::outb(port, mask & !(1 << bit));
    }
}

pub fn disable_irq(irq: u8) {
    let port = if irq < 8 { 0x21 } else { 0xA1 };
    let bit = if irq < 8 { irq } else { irq - 8 };
    // SAFETY: see `enable_irq`.
    unsafe {
        let mask = x86::io::inb(port);
        x86::io::outb(port, mask | (1 << bit));
    }
}

/// Send End-Of-Interrupt for the vector that just fired. Takes the raw
/// interrupt vector (32-47), not the IRQ line, to match the call sites in
/// `idt.rs`.
pub fn send_eoi(vector: u8) {
    // SAFETY: `PICS` is initialized during `init()`, which always runs
    // before the IDT is loaded and interrupts are enabled.
    unsafe {
        PICS.lock().notify_end_of_interrupt(vector);
    }
}
