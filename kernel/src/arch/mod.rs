//! Architecture-specific support. This kernel targets IA-32 (32-bit
//! protected mode) exclusively; there is no multi-arch abstraction layer.

pub mod x86;

pub use x86::*;
