//! Interrupt Descriptor Table: the 32 CPU exception vectors, the three IRQ
//! vectors this kernel cares about (timer, keyboard, RTC, remapped to
//! 32/33/40 by [`super::pic`]), and the `int 0x80` syscall gate.
//!
//! Exception names and the page-fault/general-protection diagnostic output
//! mirror the behavior a bare hardware trap table would produce.

use lazy_static::lazy_static;
use spin::Mutex;

use super::gdt::KERNEL_CODE_SELECTOR;
use crate::{exceptions, sched, syscall};

const IDT_ENTRIES: usize = 256;

pub const TIMER_VECTOR: u8 = 32;
pub const KEYBOARD_VECTOR: u8 = 33;
pub const RTC_VECTOR: u8 = 40;
pub const SYSCALL_VECTOR: u8 = 0x80;

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct GateDescriptor {
    offset_low: u16,
    selector: u16,
    zero: u8,
    type_attr: u8,
    offset_high: u16,
}

impl GateDescriptor {
    const fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            zero: 0,
            type_attr: 0,
            offset_high: 0,
        }
    }

    fn new(handler: u32, dpl: u8, present: bool) -> Self {
        let mut type_attr = 0b0000_1110; // 32-bit interrupt gate
        type_attr |= (dpl & 0b11) << 5;
        if present {
            type_attr |= 1 << 7;
        }
        Self {
            offset_low: (handler & 0xFFFF) as u16,
            selector: KERNEL_CODE_SELECTOR.bits(),
            zero: 0,
            type_attr,
            offset_high: ((handler >> 16) & 0xFFFF) as u16,
        }
    }
}

struct Idt {
    entries: [GateDescriptor; IDT_ENTRIES],
}

lazy_static! {
    static ref IDT: Mutex<Idt> = Mutex::new(Idt {
        entries: [GateDescriptor::missing(); IDT_ENTRIES],
    });
}

pub fn init() {
    let mut idt = IDT.lock();

    macro_rules! set_exception {
        ($vec:expr, $handler:expr) => {
            idt.entries[$vec] = GateDescriptor::new($handler as usize as u32, 0, true);
        };
    }

    set_exception!(0, divide_error_handler);
    set_exception!(1, debug_handler);
    set_exception!(2, nmi_handler);
    set_exception!(3, breakpoint_handler);
    set_exception!(4, overflow_handler);
    set_exception!(5, bound_range_handler);
    set_exception!(6, invalid_opcode_handler);
    set_exception!(7, device_not_available_handler);
    set_exception!(8, double_fault_handler);
    set_exception!(9, coprocessor_segment_overrun_handler);
    set_exception!(10, invalid_tss_handler);
    set_exception!(11, segment_not_present_handler);
    set_exception!(12, stack_fault_handler);
    set_exception!(13, general_protection_handler);
    set_exception!(14, page_fault_handler);
    set_exception!(16, fpu_error_handler);
    set_exception!(17, alignment_check_handler);
    set_exception!(18, machine_check_handler);
    set_exception!(19, simd_fp_handler);

    idt.entries[TIMER_VECTOR as usize] = GateDescriptor::new(timer_handler as usize as u32, 0, true);
    idt.entries[KEYBOARD_VECTOR as usize] =
        GateDescriptor::new(keyboard_handler as usize as u32, 0, true);
    idt.entries[RTC_VECTOR as usize] = GateDescriptor::new(rtc_handler as usize as u32, 0, true);
    // Ring 3 must be able to `int 0x80`.
    idt.entries[SYSCALL_VECTOR as usize] =
        GateDescriptor::new(syscall_handler as usize as u32, 3, true);

    let ptr = x86::dtables::DescriptorTablePointer::new_from_slice(&idt.entries);
    // SAFETY: `idt.entries` is 'static storage behind a lazy_static Mutex;
    // every populated entry above points at a valid handler with the
    // correct calling convention for its gate type.
    unsafe {
        x86::dtables::lidt(&ptr);
    }
}

extern "x86-interrupt" fn divide_error_handler() {
    exceptions::handle(exceptions::Vector::DivideError, None);
}
extern "x86-interrupt" fn debug_handler() {
    exceptions::handle(exceptions::Vector::Debug, None);
}
extern "x86-interrupt" fn nmi_handler() {
    exceptions::handle(exceptions::Vector::NonMaskableInterrupt, None);
}
extern "x86-interrupt" fn breakpoint_handler() {
    exceptions::handle(exceptions::Vector::Breakpoint, None);
}
extern "x86-interrupt" fn overflow_handler() {
    exceptions::handle(exceptions::Vector::Overflow, None);
}
extern "x86-interrupt" fn bound_range_handler() {
    exceptions::handle(exceptions::Vector::BoundRangeExceeded, None);
}
extern "x86-interrupt" fn invalid_opcode_handler() {
    exceptions::handle(exceptions::Vector::InvalidOpcode, None);
}
extern "x86-interrupt" fn device_not_available_handler() {
    exceptions::handle(exceptions::Vector::DeviceNotAvailable, None);
}
extern "x86-interrupt" fn double_fault_handler(_error_code: u32) -> ! {
    exceptions::handle(exceptions::Vector::DoubleFault, None);
    crate::arch::halt();
}
extern "x86-interrupt" fn coprocessor_segment_overrun_handler() {
    exceptions::handle(exceptions::Vector::CoprocessorSegmentOverrun, None);
}
extern "x86-interrupt" fn invalid_tss_handler(error_code: u32) {
    exceptions::handle(exceptions::Vector::InvalidTss, Some(error_code));
}
extern "x86-interrupt" fn segment_not_present_handler(error_code: u32) {
    exceptions::handle(exceptions::Vector::SegmentNotPresent, Some(error_code));
}
extern "x86-interrupt" fn stack_fault_handler(error_code: u32) {
    exceptions::handle(exceptions::Vector::StackFault, Some(error_code));
}
extern "x86-interrupt" fn general_protection_handler(error_code: u32) {
    exceptions::handle(exceptions::Vector::GeneralProtection, Some(error_code));
}
extern "x86-interrupt" fn page_fault_handler(error_code: u32) {
    let cr2 = unsafe { x86::controlregs::cr2() };
    exceptions::handle_page_fault(error_code, cr2);
}
extern "x86-interrupt" fn fpu_error_handler() {
    exceptions::handle(exceptions::Vector::FpuError, None);
}
extern "x86-interrupt" fn alignment_check_handler(error_code: u32) {
    exceptions::handle(exceptions::Vector::AlignmentCheck, Some(error_code));
}
extern "x86-interrupt" fn machine_check_handler() {
    exceptions::handle(exceptions::Vector::MachineCheck, None);
}
extern "x86-interrupt" fn simd_fp_handler() {
    exceptions::handle(exceptions::Vector::SimdFloatingPoint, None);
}

extern "x86-interrupt" fn timer_handler() {
    // EOI goes out before the scheduler runs: `on_timer_tick` may transfer
    // control into a different process entirely and never return through
    // this frame (a fresh shell spawned on an empty terminal enters ring 3
    // directly), which would otherwise leave the PIC waiting forever for an
    // acknowledgment it never gets.
    super::pic::send_eoi(TIMER_VECTOR);
    sched::on_timer_tick();
}

extern "x86-interrupt" fn keyboard_handler() {
    crate::drivers::keyboard::on_interrupt();
    super::pic::send_eoi(KEYBOARD_VECTOR);
}

extern "x86-interrupt" fn rtc_handler() {
    crate::fs::rtc::on_interrupt();
    super::pic::send_eoi(RTC_VECTOR);
}

/// `int 0x80` entry point. Captures the four ABI registers (syscall number
/// in `eax`, arguments in `ebx`/`ecx`/`edx`) by hand: the `x86-interrupt`
/// ABI frame does not expose general-purpose registers, so this trampoline
/// is written in raw assembly rather than as a typed handler.
#[unsafe(naked)]
extern "C" fn syscall_handler() {
    // SAFETY: standard register-save/dispatch/restore/iret trampoline for a
    // software interrupt gate; `syscall::dispatch` uses the System V-like
    // eax/ebx/ecx/edx convention spec'd for this kernel's syscall ABI.
    core::arch::naked_asm!(
        "push ebp",
        "push edi",
        "push esi",
        "push edx",
        "push ecx",
        "push ebx",
        "push eax",
        "call {dispatch}",
        // `ret` inside the trampoline already restored esp to exactly
        // where it was before `call` (cdecl never adjusts esp itself),
        // so esp still points at the slot this pushed `eax` into --
        // overwrite it in place with the return value.
        "mov [esp], eax",
        "pop eax",
        "pop ebx",
        "pop ecx",
        "pop edx",
        "pop esi",
        "pop edi",
        "pop ebp",
        "iretd",
        dispatch = sym syscall_dispatch_trampoline,
    );
}

/// Called from [`syscall_handler`] with the raw call number and arguments
/// already on the stack in register-save order; re-packs them into
/// [`syscall::dispatch`]'s typed signature.
extern "C" fn syscall_dispatch_trampoline(
    eax: u32,
    ebx: u32,
    ecx: u32,
    edx: u32,
) -> u32 {
    syscall::dispatch(eax, ebx, ecx, edx) as u32
}
