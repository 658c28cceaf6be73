//! 8253/8254 Programmable Interval Timer, channel 0, mode 3 (square wave),
//! programmed for a ~100 Hz scheduler tick: divisor 11931 against the
//! 1.193182 MHz PIT clock.

const PIT_COMMAND: u16 = 0x43;
const PIT_CHANNEL0: u16 = 0x40;
const PIT_DIVISOR: u16 = 11931;

pub fn init() {
    // SAFETY: 0x43/0x40 are the documented PIT command and channel-0 data
    // ports; mode byte selects channel 0, lobyte/hibyte access, mode 3.
    unsafe {
        x86::io::outb(PIT_COMMAND, 0x36);
        x86::io::outb(PIT_CHANNEL0, (PIT_DIVISOR & 0xFF) as u8);
        x86::io::outb(PIT_CHANNEL0, (PIT_DIVISOR >> 8) as u8);
    }
}

/// Nominal tick rate this kernel programs the PIT for. Used by the RTC
/// virtual-tick divider, which needs to know how many scheduler ticks are
/// roughly a second's worth of wall time.
pub const TICK_HZ: u32 = 100;
