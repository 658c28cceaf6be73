//! CPU exception dispatch: names every IA-32 exception vector, prints a
//! diagnostic (plus `cr2` for page faults, plus `ss0`/`esp0` for
//! general-protection faults), and terminates whichever process was
//! running when the fault occurred with exit status 256 -- or halts the
//! CPU outright if no process was running yet.

use crate::process;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Vector {
    DivideError = 0,
    Debug = 1,
    NonMaskableInterrupt = 2,
    Breakpoint = 3,
    Overflow = 4,
    BoundRangeExceeded = 5,
    InvalidOpcode = 6,
    DeviceNotAvailable = 7,
    DoubleFault = 8,
    CoprocessorSegmentOverrun = 9,
    InvalidTss = 10,
    SegmentNotPresent = 11,
    StackFault = 12,
    GeneralProtection = 13,
    PageFault = 14,
    FpuError = 16,
    AlignmentCheck = 17,
    MachineCheck = 18,
    SimdFloatingPoint = 19,
}

impl Vector {
    pub fn name(self) -> &'static str {
        match self {
            Vector::DivideError => "divide error",
            Vector::Debug => "debug",
            Vector::NonMaskableInterrupt => "non-maskable interrupt",
            Vector::Breakpoint => "breakpoint",
            Vector::Overflow => "overflow",
            Vector::BoundRangeExceeded => "bound range exceeded",
            Vector::InvalidOpcode => "invalid opcode",
            Vector::DeviceNotAvailable => "device not available",
            Vector::DoubleFault => "double fault",
            Vector::CoprocessorSegmentOverrun => "coprocessor segment overrun",
            Vector::InvalidTss => "invalid TSS",
            Vector::SegmentNotPresent => "segment not present",
            Vector::StackFault => "stack fault",
            Vector::GeneralProtection => "general protection fault",
            Vector::PageFault => "page fault",
            Vector::FpuError => "x87 FPU error",
            Vector::AlignmentCheck => "alignment check",
            Vector::MachineCheck => "machine check",
            Vector::SimdFloatingPoint => "SIMD floating-point exception",
        }
    }
}

/// Handle any exception other than a page fault (which needs `cr2`).
pub fn handle(vector: Vector, error_code: Option<u32>) {
    match error_code {
        Some(code) => log::error!("exception: {} (error code 0x{:x})", vector.name(), code),
        None => log::error!("exception: {}", vector.name()),
    }
    terminate_faulting_process();
}

pub fn handle_page_fault(error_code: u32, cr2: usize) {
    log::error!(
        "exception: page fault at 0x{:x} (error code 0x{:x})",
        cr2,
        error_code
    );
    terminate_faulting_process();
}

/// Exit status `halt` reports to a parent when a child dies of an
/// exception, per the syscall ABI's `256` sentinel (out of the normal
/// 0-255 `u8` exit-status range).
pub const EXCEPTION_EXIT_STATUS: u32 = 256;

fn terminate_faulting_process() {
    if let Some(pid) = process::current_pid() {
        process::halt_current(pid, EXCEPTION_EXIT_STATUS);
    } else {
        log::error!("exception with no running process; halting");
        crate::arch::halt();
    }
}
