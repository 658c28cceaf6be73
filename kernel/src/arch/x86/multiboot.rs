//! Multiboot2 boot-information parsing.
//!
//! The boot contract: the loader places one module in the multiboot module
//! table whose `mod_start`/`mod_end` bound the filesystem image. This
//! kernel reads the first module tag and hands the resulting byte range to
//! `fs::image`.

use multiboot2::{BootInformation, BootInformationHeader};

#[derive(Debug, Clone, Copy)]
pub struct FsImage {
    pub start: usize,
    pub end: usize,
}

/// Parse the multiboot2 info block the bootloader left in `ebx` at kernel
/// entry and locate the filesystem image module.
///
/// # Safety
/// `multiboot_info_addr` must be the untouched physical address the
/// bootloader passed in `ebx`, and must still be mapped and unmodified.
pub unsafe fn find_fs_image(multiboot_info_addr: usize) -> Option<FsImage> {
    // SAFETY: forwarded from the caller's contract.
    let boot_info = unsafe {
        BootInformation::load(multiboot_info_addr as *const BootInformationHeader).ok()?
    };
    let module = boot_info.module_tags().next()?;
    Some(FsImage {
        start: module.start_address() as usize,
        end: module.end_address() as usize,
    })
}
