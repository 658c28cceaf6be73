//! Process Control Block.
//!
//! Six PCBs exist, period -- no allocation, no growth. Each occupies the
//! top of its own statically placed 8 KiB kernel stack (see
//! `mm::layout::kernel_stack_top`), expressed here as a fixed array index
//! rather than pointer arithmetic over a raw stack address.

use crate::{arch::x86::context::SavedContext, fs::descriptor::FileTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TerminalId(pub u8);

pub const MAX_ARGS_LEN: usize = 128;

pub struct Pcb {
    pub pid: ProcessId,
    pub slot: usize,
    pub parent: Option<ProcessId>,
    pub terminal: TerminalId,
    pub args: [u8; MAX_ARGS_LEN],
    pub args_len: usize,
    pub fds: FileTable,
    /// Kernel-stack context to resume, with the child's exit status placed
    /// in `eax`, when this process's `execute` call returns (i.e. when a
    /// child of this process halts).
    pub resume_ctx: SavedContext,
    /// Kernel-stack context to resume when this process is rescheduled
    /// after being preempted mid-tick by `sched::on_timer_tick`. `None`
    /// until the first time this process is preempted.
    pub sched_ctx: Option<SavedContext>,
    pub kernel_stack_top: u32,
    /// Whether this process currently has a `vidmap` window mapped.
    pub video_mapped: bool,
}

impl Pcb {
    pub fn new(
        pid: ProcessId,
        slot: usize,
        parent: Option<ProcessId>,
        terminal: TerminalId,
        kernel_stack_top: u32,
    ) -> Self {
        Self {
            pid,
            slot,
            parent,
            terminal,
            args: [0; MAX_ARGS_LEN],
            args_len: 0,
            fds: FileTable::new(),
            resume_ctx: SavedContext::default(),
            sched_ctx: None,
            kernel_stack_top,
            video_mapped: false,
        }
    }

    pub fn set_args(&mut self, args: &[u8]) {
        let n = args.len().min(MAX_ARGS_LEN);
        self.args[..n].copy_from_slice(&args[..n]);
        self.args_len = n;
    }
}
