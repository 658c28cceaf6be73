//! Read-only filesystem image and the per-process file-descriptor layer
//! built on top of it.

pub mod descriptor;
pub mod image;
pub mod rtc;

use crate::process::TerminalId;

pub fn init(image_base: *const u8, image_len: usize) {
    // SAFETY: `image_base`/`image_len` come from `arch::x86::multiboot`,
    // which derives them from the multiboot module table at boot; they
    // remain valid and unmodified for the kernel's lifetime.
    unsafe {
        image::init(image_base, image_len);
    }
    rtc::init();
    log::info!("fs: image mounted, {} entries", image::num_dentries());
}

pub(crate) fn terminal_read(terminal: TerminalId, buf: &mut [u8]) -> usize {
    crate::terminal::read(terminal, buf)
}

pub(crate) fn terminal_write(terminal: TerminalId, buf: &[u8]) -> usize {
    crate::terminal::write(terminal, buf)
}
