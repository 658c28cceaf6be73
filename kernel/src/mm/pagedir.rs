//! The page directory and its two statically allocated page tables.
//!
//! IA-32 lets a page directory mix 4 KiB and 4 MiB entries. This kernel
//! uses exactly one directory for the whole system:
//!
//! - Entry 0 (0-4 MiB): a 4 KiB page table (`PAGE_TABLE_0`) so the VGA
//!   framebuffer and the three video backup pages can each get their own
//!   present/absent bit.
//! - Entry for the kernel image (4-8 MiB): one 4 MiB page.
//! - Entry for the currently scheduled process's program image: one 4 MiB
//!   page, remapped on every context switch to point at that process's
//!   physical slot.
//! - Entry for the `vidmap` window: a 4 KiB page table (`PAGE_TABLE_VIDEO`)
//!   with a single entry, enabled only while the owning process runs.

use bitflags::bitflags;
use lazy_static::lazy_static;
use spin::Mutex;

use super::layout::*;

bitflags! {
    #[derive(Clone, Copy)]
    pub struct EntryFlags: u32 {
        const PRESENT      = 1 << 0;
        const WRITABLE     = 1 << 1;
        const USER         = 1 << 2;
        const WRITE_THROUGH= 1 << 3;
        const CACHE_DISABLE= 1 << 4;
        const ACCESSED     = 1 << 5;
        const DIRTY        = 1 << 6;
        const PAGE_SIZE_4M = 1 << 7;
        const GLOBAL       = 1 << 8;
    }
}

#[derive(Clone, Copy, Default)]
#[repr(transparent)]
pub struct PageDirectoryEntry(u32);

impl PageDirectoryEntry {
    const fn empty() -> Self {
        Self(0)
    }

    fn table(phys_addr: u32, flags: EntryFlags) -> Self {
        Self((phys_addr & 0xFFFF_F000) | flags.bits())
    }

    fn huge_page(phys_addr: u32, flags: EntryFlags) -> Self {
        Self((phys_addr & 0xFFC0_0000) | (flags | EntryFlags::PAGE_SIZE_4M).bits())
    }

    fn is_present(self) -> bool {
        self.0 & EntryFlags::PRESENT.bits() != 0
    }
}

#[derive(Clone, Copy, Default)]
#[repr(transparent)]
pub struct PageTableEntry(u32);

impl PageTableEntry {
    const fn empty() -> Self {
        Self(0)
    }

    fn page(phys_addr: u32, flags: EntryFlags) -> Self {
        Self((phys_addr & 0xFFFF_F000) | flags.bits())
    }
}

#[repr(C, align(4096))]
pub struct PageDirectory([PageDirectoryEntry; 1024]);

#[repr(C, align(4096))]
pub struct PageTable([PageTableEntry; 1024]);

static mut KERNEL_PD: PageDirectory = PageDirectory([PageDirectoryEntry::empty(); 1024]);
static mut PAGE_TABLE_0: PageTable = PageTable([PageTableEntry::empty(); 1024]);
static mut PAGE_TABLE_VIDEO: PageTable = PageTable([PageTableEntry::empty(); 1024]);

lazy_static! {
    /// Guards all mutation of the directory/tables above. Every mutating
    /// operation in this module takes the lock for its duration and the
    /// caller is expected to have interrupts disabled (context switches and
    /// syscalls already run with interrupts masked at the relevant points).
    static ref PAGING_LOCK: Mutex<()> = Mutex::new(());
}

const KERNEL_PDE_INDEX: usize = 1; // covers 4-8 MiB
const USER_PDE_INDEX: usize = (USER_PAGE_VADDR >> 22) as usize;
const VIDEO_PDE_INDEX: usize = (USER_VIDEO_VADDR >> 22) as usize;

pub fn init() {
    let _guard = PAGING_LOCK.lock();
    // SAFETY: single-threaded boot-time initialization, no concurrent
    // access to the statics above is possible yet (interrupts are not
    // enabled until `arch::init` finishes, after `mm::init` runs).
    unsafe {
        let pd = &raw mut KERNEL_PD;
        let pt0 = &raw mut PAGE_TABLE_0;
        let ptv = &raw mut PAGE_TABLE_VIDEO;

        for entry in (*pt0).0.iter_mut() {
            *entry = PageTableEntry::empty();
        }
        (*pt0).0[(VGA_PHYS_ADDR >> 12) as usize] =
            PageTableEntry::page(VGA_PHYS_ADDR, EntryFlags::PRESENT | EntryFlags::WRITABLE);
        for &backup in VIDEO_BACKUP_PHYS.iter() {
            (*pt0).0[(backup >> 12) as usize] =
                PageTableEntry::page(backup, EntryFlags::PRESENT | EntryFlags::WRITABLE);
        }

        for entry in (*pd).0.iter_mut() {
            *entry = PageDirectoryEntry::empty();
        }
        (*pd).0[0] = PageDirectoryEntry::table(
            pt0 as u32,
            EntryFlags::PRESENT | EntryFlags::WRITABLE,
        );
        (*pd).0[KERNEL_PDE_INDEX] = PageDirectoryEntry::huge_page(
            KERNEL_PAGE_PHYS,
            EntryFlags::PRESENT | EntryFlags::WRITABLE | EntryFlags::GLOBAL,
        );
        (*pd).0[VIDEO_PDE_INDEX] = PageDirectoryEntry::table(
            ptv as u32,
            EntryFlags::PRESENT | EntryFlags::WRITABLE | EntryFlags::USER,
        );

        load_directory(pd as u32);
        enable_paging();
    }
}

/// # Safety
/// `pd_phys` must be the physical address of a fully initialized,
/// 4 KiB-aligned page directory.
unsafe fn load_directory(pd_phys: u32) {
    // SAFETY: forwarded from the caller's contract; writes CR3.
    unsafe {
        x86::controlregs::cr3_write(pd_phys as u64);
    }
}

/// # Safety
/// Must only be called once, after `load_directory` has installed a valid
/// page directory covering the kernel's own code and the stack it is
/// running on.
unsafe fn enable_paging() {
    // SAFETY: sets CR0.PG and CR4.PSE (for the 4 MiB kernel/program
    // entries); forwarded from the caller's contract.
    unsafe {
        let mut cr4 = x86::controlregs::cr4();
        cr4 |= x86::controlregs::Cr4::CR4_ENABLE_PSE;
        x86::controlregs::cr4_write(cr4);

        let mut cr0 = x86::controlregs::cr0();
        cr0 |= x86::controlregs::Cr0::CR0_ENABLE_PAGING;
        x86::controlregs::cr0_write(cr0);
    }
}

/// Point the user program PDE at `slot`'s physical 4 MiB page and flush
/// the TLB. Called on every context switch.
pub fn switch_to_process(slot: usize) {
    let _guard = PAGING_LOCK.lock();
    let phys = user_page_phys(slot);
    // SAFETY: `slot < MAX_PROCESSES` is the caller's contract (enforced by
    // `process::table`); writing a single PDE and flushing CR3 is the
    // documented way to remap a huge page.
    unsafe {
        let pd = &raw mut KERNEL_PD;
        (*pd).0[USER_PDE_INDEX] = PageDirectoryEntry::huge_page(
            phys,
            EntryFlags::PRESENT | EntryFlags::WRITABLE | EntryFlags::USER,
        );
        flush_tlb();
    }
}

/// Map the `vidmap` page to `video_phys` (either the real framebuffer or a
/// backup page) and mark it present.
pub fn enable_user_video_page(video_phys: u32) {
    let _guard = PAGING_LOCK.lock();
    // SAFETY: `video_phys` is one of `VGA_PHYS_ADDR`/`VIDEO_BACKUP_PHYS`,
    // both of which are always mapped present in `PAGE_TABLE_0`.
    unsafe {
        let ptv = &raw mut PAGE_TABLE_VIDEO;
        (*ptv).0[0] = PageTableEntry::page(
            video_phys,
            EntryFlags::PRESENT | EntryFlags::WRITABLE | EntryFlags::USER,
        );
        flush_tlb();
    }
}

pub fn disable_user_video_page() {
    let _guard = PAGING_LOCK.lock();
    // SAFETY: clearing the present bit on a page this process no longer
    // has `vidmap`'d.
    unsafe {
        let ptv = &raw mut PAGE_TABLE_VIDEO;
        (*ptv).0[0] = PageTableEntry::empty();
        flush_tlb();
    }
}

/// # Safety
/// `dst`/`src` must each point at a full 4 KiB page that is mapped and
/// readable/writable by the kernel.
pub unsafe fn copy_video_page(dst: u32, src: u32) {
    // SAFETY: forwarded from the caller's contract; both addresses are
    // identity-mapped physical pages in the kernel's own page table.
    unsafe {
        core::ptr::copy_nonoverlapping(src as *const u8, dst as *mut u8, 4096);
    }
}

pub fn flush_tlb() {
    // SAFETY: reloading CR3 with its current value flushes the TLB
    // (excluding global pages); always valid once paging is enabled.
    unsafe {
        let cr3 = x86::controlregs::cr3();
        x86::controlregs::cr3_write(cr3);
    }
}
