//! Real-Time Clock device: a 2 Hz-minimum, power-of-two-up-to-512 Hz
//! virtual tick rate layered over the CMOS RTC's fixed physical interrupt
//! rate, divided further by the number of terminals so three simultaneous
//! readers each see their own requested rate rather than contending for
//! one physical tick.
//!
//! The rate divisor lives in its own named field on each descriptor
//! ([`RtcDescriptor::rate_divisor`]) rather than being folded into a
//! generic "position" field shared with the other device kinds.

use spin::Mutex;

use crate::mm::layout::MAX_TERMINALS;

const CMOS_INDEX_PORT: u16 = 0x70;
const CMOS_DATA_PORT: u16 = 0x71;
const MAX_RTC_FREQ: u16 = 512;
const DEFAULT_RTC_FREQ: u16 = 2;

static PHYSICAL_TICKS: Mutex<u32> = Mutex::new(0);

pub fn init() {
    // SAFETY: standard CMOS RTC register-B periodic-interrupt-enable
    // sequence; NMI bit (0x80) is preserved as disabled per convention.
    unsafe {
        x86::io::outb(CMOS_INDEX_PORT, 0x8B);
        let prev = x86::io::inb(CMOS_DATA_PORT);
        x86::io::outb(CMOS_INDEX_PORT, 0x8B);
        x86::io::outb(CMOS_DATA_PORT, prev | 0x40);
    }
}

/// Called from the RTC's IDT handler (vector 40 / IRQ8).
pub fn on_interrupt() {
    *PHYSICAL_TICKS.lock() += 1;
    // SAFETY: reading register C acknowledges the RTC interrupt; without
    // this the RTC stops firing after the first tick.
    unsafe {
        x86::io::outb(CMOS_INDEX_PORT, 0x0C);
        x86::io::inb(CMOS_DATA_PORT);
    }
}

fn physical_ticks() -> u32 {
    *PHYSICAL_TICKS.lock()
}

#[derive(Debug, Clone, Copy)]
pub struct RtcDescriptor {
    pub rate_divisor: u16,
    last_seen_tick: u32,
}

impl RtcDescriptor {
    pub fn open() -> Self {
        Self {
            rate_divisor: divisor_for(DEFAULT_RTC_FREQ),
            last_seen_tick: physical_ticks(),
        }
    }

    /// Busy-wait until a physical tick occurs and the caller's virtual
    /// rate is due. Interrupts must remain enabled across the wait.
    pub fn read(&mut self) {
        // Reached through `int 0x80`, whose gate clears IF on entry; without
        // re-enabling it here IRQ8 could never land and `PHYSICAL_TICKS`
        // would never advance.
        unsafe {
            x86::irq::enable();
        }
        let start = physical_ticks();
        while physical_ticks() == start {
            core::hint::spin_loop();
        }
        loop {
            let now = physical_ticks();
            if now.wrapping_sub(self.last_seen_tick) >= self.rate_divisor as u32 {
                self.last_seen_tick = now;
                unsafe {
                    x86::irq::disable();
                }
                return;
            }
            core::hint::spin_loop();
        }
    }

    /// `write(freq)`: `freq` must be a power of two, 2..=512.
    pub fn write(&mut self, freq: u16) -> bool {
        if freq == 0 || freq > MAX_RTC_FREQ || (freq & (freq - 1)) != 0 {
            return false;
        }
        self.rate_divisor = divisor_for(freq);
        true
    }
}

fn divisor_for(freq: u16) -> u16 {
    let base = (MAX_RTC_FREQ / freq.max(1)).max(1);
    (base / MAX_TERMINALS as u16).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{KernelError, SyscallError};

    fn descriptor() -> RtcDescriptor {
        RtcDescriptor {
            rate_divisor: divisor_for(DEFAULT_RTC_FREQ),
            last_seen_tick: 0,
        }
    }

    #[test_case]
    fn write_accepts_max_frequency() -> Result<(), KernelError> {
        if !descriptor().write(512) {
            return Err(SyscallError::BadArgument.into());
        }
        Ok(())
    }

    #[test_case]
    fn write_rejects_above_max() -> Result<(), KernelError> {
        if descriptor().write(513) {
            return Err(SyscallError::BadArgument.into());
        }
        Ok(())
    }

    #[test_case]
    fn write_rejects_zero() -> Result<(), KernelError> {
        if descriptor().write(0) {
            return Err(SyscallError::BadArgument.into());
        }
        Ok(())
    }

    #[test_case]
    fn write_rejects_non_power_of_two() -> Result<(), KernelError> {
        if descriptor().write(7) {
            return Err(SyscallError::BadArgument.into());
        }
        Ok(())
    }
}
