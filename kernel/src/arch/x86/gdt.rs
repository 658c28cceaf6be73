//! Global Descriptor Table and Task State Segment.
//!
//! A flat segmentation model: one kernel code/data pair at ring 0, one user
//! code/data pair at ring 3, and a single TSS used to supply `esp0` on every
//! ring 3 -> ring 0 transition (interrupt, exception, or `int 0x80`).
//! `esp0` is rewritten on every context switch (see [`set_kernel_stack`]) to
//! point at the kernel stack of whichever process is about to run.

use lazy_static::lazy_static;
use spin::Mutex;
use x86::{
    dtables::{lgdt, DescriptorTablePointer},
    segmentation::{
        BuildDescriptor, CodeSegmentType, DataSegmentType, Descriptor as SegDescriptor,
        DescriptorBuilder, SegmentSelector,
    },
    task::tr,
    Ring,
};

pub const KERNEL_CODE_SELECTOR: SegmentSelector = SegmentSelector::new(1, Ring::Ring0);
pub const KERNEL_DATA_SELECTOR: SegmentSelector = SegmentSelector::new(2, Ring::Ring0);
pub const USER_CODE_SELECTOR: SegmentSelector = SegmentSelector::new(3, Ring::Ring3);
pub const USER_DATA_SELECTOR: SegmentSelector = SegmentSelector::new(4, Ring::Ring3);
const TSS_INDEX: u16 = 5;

/// Minimal 32-bit TSS. Only `esp0`/`ss0` are used by this kernel -- no
/// hardware task switching, no I/O permission bitmap.
#[repr(C, packed)]
#[derive(Clone, Copy)]
struct TaskStateSegment {
    link: u16,
    _r0: u16,
    esp0: u32,
    ss0: u16,
    _r1: u16,
    esp1: u32,
    ss1: u16,
    _r2: u16,
    esp2: u32,
    ss2: u16,
    _r3: u16,
    cr3: u32,
    eip: u32,
    eflags: u32,
    eax: u32,
    ecx: u32,
    edx: u32,
    ebx: u32,
    esp: u32,
    ebp: u32,
    esi: u32,
    edi: u32,
    es: u16,
    _r4: u16,
    cs: u16,
    _r5: u16,
    ss: u16,
    _r6: u16,
    ds: u16,
    _r7: u16,
    fs: u16,
    _r8: u16,
    gs: u16,
    _r9: u16,
    ldtr: u16,
    _r10: u16,
    _trap: u16,
    iomap_base: u16,
}

impl TaskStateSegment {
    const fn new() -> Self {
        // SAFETY-free: every field is a plain integer, zero is a valid TSS.
        unsafe { core::mem::zeroed() }
    }
}

lazy_static! {
    static ref TSS: Mutex<TaskStateSegment> = Mutex::new(TaskStateSegment::new());
}

/// 8-byte raw GDT entry, built by hand for the TSS descriptor (the `x86`
/// crate's segment descriptor builder targets code/data segments, not
/// system segments like a 32-bit TSS).
fn tss_descriptor(base: u32, limit: u32) -> u64 {
    let mut low = (limit & 0xFFFF) as u64;
    low |= (base as u64 & 0xFFFF) << 16;
    let mut high = (base >> 16) & 0xFF;
    high |= 0b1000_1001 << 8; // present, ring 0, 32-bit TSS (available)
    high |= ((limit >> 16) & 0xF) << 16;
    high |= ((base >> 24) & 0xFF) << 24;
    low | (high << 32)
}

struct Gdt {
    entries: [u64; 6],
}

lazy_static! {
    static ref GDT: Mutex<Gdt> = Mutex::new(Gdt {
        entries: [0; 6],
    });
}

pub fn init() {
    let tss_base = {
        let tss = TSS.lock();
        &*tss as *const TaskStateSegment as u32
    };
    let tss_limit = core::mem::size_of::<TaskStateSegment>() as u32 - 1;

    let code: SegDescriptor = DescriptorBuilder::code_descriptor(0, 0xFFFFF, CodeSegmentType::ExecuteRead)
        .present()
        .dpl(Ring::Ring0)
        .limit_granularity_4kb()
        .db()
        .finish();
    let data: SegDescriptor = DescriptorBuilder::data_descriptor(0, 0xFFFFF, DataSegmentType::ReadWrite)
        .present()
        .dpl(Ring::Ring0)
        .limit_granularity_4kb()
        .db()
        .finish();
    let user_code: SegDescriptor =
        DescriptorBuilder::code_descriptor(0, 0xFFFFF, CodeSegmentType::ExecuteRead)
            .present()
            .dpl(Ring::Ring3)
            .limit_granularity_4kb()
            .db()
            .finish();
    let user_data: SegDescriptor =
        DescriptorBuilder::data_descriptor(0, 0xFFFFF, DataSegmentType::ReadWrite)
            .present()
            .dpl(Ring::Ring3)
            .limit_granularity_4kb()
            .db()
            .finish();

    let mut gdt = GDT.lock();
    gdt.entries[0] = 0;
    gdt.entries[1] = code.as_u64();
    gdt.entries[2] = data.as_u64();
    gdt.entries[3] = user_code.as_u64();
    gdt.entries[4] = user_data.as_u64();
    gdt.entries[5] = tss_descriptor(tss_base, tss_limit);

    let ptr = DescriptorTablePointer::new_from_slice(&gdt.entries);
    // SAFETY: `gdt.entries` outlives this function (it is a 'static mutex
    // guard backing store); `ptr` is constructed from that exact slice.
    unsafe {
        lgdt(&ptr);
        reload_segments();
        x86::task::load_tr(SegmentSelector::new(TSS_INDEX, Ring::Ring0));
    }
    let _ = tr();
}

/// Reload the data/stack segment registers and far-jump to reload `cs`
/// after loading a new GDT.
///
/// # Safety
/// Must only be called immediately after `lgdt` with a GDT that defines
/// [`KERNEL_CODE_SELECTOR`]/[`KERNEL_DATA_SELECTOR`] at the indices used
/// here.
unsafe fn reload_segments() {
    use core::arch::asm;
    unsafe {
        asm!(
            "mov ax, {data_sel:x}",
            "mov ds, ax",
            "mov es, ax",
            "mov fs, ax",
            "mov gs, ax",
            "mov ss, ax",
            "push {code_sel}",
            "lea eax, [2f]",
            "push eax",
            "retf",
            "2:",
            data_sel = in(reg) KERNEL_DATA_SELECTOR.bits(),
            code_sel = in(reg) KERNEL_CODE_SELECTOR.bits() as u32,
            out("eax") _,
        );
    }
}

/// Update `esp0` in the TSS. Called on every context switch so that the
/// next ring 3 -> ring 0 transition lands on the incoming process's kernel
/// stack. Must be called with interrupts disabled.
pub fn set_kernel_stack(esp0: u32) {
    let mut tss = TSS.lock();
    tss.esp0 = esp0;
    tss.ss0 = KERNEL_DATA_SELECTOR.bits() as u32;
}
