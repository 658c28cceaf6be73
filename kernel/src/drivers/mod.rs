//! Device drivers outside the `arch::x86` bus (PIC/PIT/VGA live there since
//! they are wired straight into the IDT). The PS/2 keyboard is the only
//! one this kernel needs.

pub mod keyboard;

pub fn init() {
    keyboard::init();
    log::info!("drivers: keyboard initialized");
}
