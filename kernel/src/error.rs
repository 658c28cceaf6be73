//! Kernel error types.
//!
//! Internal code returns `KernelResult<T>` and propagates with `?`; the
//! syscall dispatcher is the boundary that converts a `KernelError` into
//! the `-1`/sentinel/`256` conventions the syscall ABI specifies.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "kernel errors must be handled, not silently discarded"]
pub enum KernelError {
    Memory(MemError),
    Process(ProcessError),
    Syscall(SyscallError),
    Fs(FsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemError {
    /// No 4 MiB process slot is free.
    NoFreeFrame,
    InvalidAddress { addr: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    /// All 6 PCB slots are in use.
    TableFull,
    /// The active terminal already has 4 processes running.
    TerminalFull,
    NotFound { pid: u8 },
    /// The named executable does not exist or fails the magic-byte check.
    NotExecutable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    InvalidCall { nr: u32 },
    BadFileDescriptor { fd: i32 },
    BadBuffer,
    BadArgument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    NotFound,
    NameTooLong,
    NoFreeDescriptor,
    NotADirectory,
    NotReadable,
    ReadOnly,
}

pub type KernelResult<T> = Result<T, KernelError>;

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(e) => write!(f, "memory error: {:?}", e),
            Self::Process(e) => write!(f, "process error: {:?}", e),
            Self::Syscall(e) => write!(f, "syscall error: {:?}", e),
            Self::Fs(e) => write!(f, "filesystem error: {:?}", e),
        }
    }
}

impl From<MemError> for KernelError {
    fn from(e: MemError) -> Self {
        Self::Memory(e)
    }
}

impl From<ProcessError> for KernelError {
    fn from(e: ProcessError) -> Self {
        Self::Process(e)
    }
}

impl From<SyscallError> for KernelError {
    fn from(e: SyscallError) -> Self {
        Self::Syscall(e)
    }
}

impl From<FsError> for KernelError {
    fn from(e: FsError) -> Self {
        Self::Fs(e)
    }
}
