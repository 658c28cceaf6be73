//! Paging manager.
//!
//! A single shared page directory maps the kernel (identity, 4 MiB pages)
//! and a 4 KiB-paged first 4 MiB that covers the VGA framebuffer and the
//! three per-terminal video backup pages. Each process gets its own 4 MiB
//! page mapped at a fixed user virtual address, plus, while it is the
//! scheduled-on-this-terminal process, a one-page "vidmap" window onto
//! whichever video buffer its terminal currently owns.

pub mod layout;
pub mod pagedir;

pub use layout::*;

pub fn init() {
    pagedir::init();
    log::info!("mm: page directory installed, paging enabled");
}
