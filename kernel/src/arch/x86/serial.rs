//! 16550 UART on COM1 (0x3F8), used for `serial_print!`/`serial_println!`
//! debug output and, when the kernel is built with the `serial-log`
//! feature, to mirror every `log::` record in addition to the VGA console.

use core::fmt;

use spin::Mutex;
use uart_16550::SerialPort;

static COM1: Mutex<SerialPort> = Mutex::new(unsafe { SerialPort::new(0x3F8) });

pub fn init() {
    COM1.lock().init();
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use fmt::Write;
    // SAFETY: disabling interrupts around the UART write avoids a deadlock
    // if an interrupt handler also wants to log while we hold the lock.
    unsafe {
        x86::irq::disable();
    }
    COM1.lock().write_fmt(args).ok();
    // SAFETY: re-enabling what was unconditionally disabled just above.
    unsafe {
        x86::irq::enable();
    }
}
