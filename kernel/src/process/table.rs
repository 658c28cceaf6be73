//! The fixed 6-slot process table and the per-terminal stack of running
//! PIDs used to find a terminal's current foreground process (needed by
//! `halt` to know whether to respawn a shell or resume a parent).

use spin::Mutex;

use super::pcb::{Pcb, ProcessId, TerminalId};
use crate::{
    error::{KernelResult, ProcessError},
    mm::layout::{kernel_stack_top, MAX_PROCESSES, MAX_PROCESSES_PER_TERMINAL, MAX_TERMINALS},
};

static PROCESSES: Mutex<[Option<Pcb>; MAX_PROCESSES]> = Mutex::new([const { None }; MAX_PROCESSES]);

/// Stack of PIDs per terminal, innermost (most recently executed) last.
static TERMINAL_STACKS: Mutex<[[Option<ProcessId>; MAX_PROCESSES_PER_TERMINAL]; MAX_TERMINALS]> =
    Mutex::new([[None; MAX_PROCESSES_PER_TERMINAL]; MAX_TERMINALS]);

static CURRENT: Mutex<Option<ProcessId>> = Mutex::new(None);

pub fn init() {
    *PROCESSES.lock() = [const { None }; MAX_PROCESSES];
    *TERMINAL_STACKS.lock() = [[None; MAX_PROCESSES_PER_TERMINAL]; MAX_TERMINALS];
    *CURRENT.lock() = None;
}

fn terminal_depth(terminal: TerminalId) -> usize {
    TERMINAL_STACKS.lock()[terminal.0 as usize]
        .iter()
        .filter(|p| p.is_some())
        .count()
}

pub fn create(parent: Option<ProcessId>, terminal: TerminalId) -> KernelResult<ProcessId> {
    if terminal_depth(terminal) >= MAX_PROCESSES_PER_TERMINAL {
        return Err(ProcessError::TerminalFull.into());
    }
    let mut table = PROCESSES.lock();
    let slot = table
        .iter()
        .position(|p| p.is_none())
        .ok_or(ProcessError::TableFull)?;
    let pid = ProcessId(slot as u8);
    let mut pcb = Pcb::new(pid, slot, parent, terminal, kernel_stack_top(slot));
    pcb.fds.bind_terminal(terminal);
    table[slot] = Some(pcb);
    drop(table);

    let mut stacks = TERMINAL_STACKS.lock();
    let stack = &mut stacks[terminal.0 as usize];
    let depth = stack.iter().position(|p| p.is_none()).unwrap();
    stack[depth] = Some(pid);

    Ok(pid)
}

pub fn destroy(pid: ProcessId) {
    let terminal = with(pid, |pcb| pcb.terminal);
    let Some(terminal) = terminal else { return };

    let mut stacks = TERMINAL_STACKS.lock();
    let stack = &mut stacks[terminal.0 as usize];
    if let Some(depth) = stack.iter().position(|p| *p == Some(pid)) {
        stack[depth] = None;
    }
    drop(stacks);

    PROCESSES.lock()[pid.0 as usize] = None;
}

pub fn with<R>(pid: ProcessId, f: impl FnOnce(&Pcb) -> R) -> Option<R> {
    PROCESSES.lock()[pid.0 as usize].as_ref().map(f)
}

pub fn with_mut<R>(pid: ProcessId, f: impl FnOnce(&mut Pcb) -> R) -> Option<R> {
    PROCESSES.lock()[pid.0 as usize].as_mut().map(f)
}

/// The PID directly below `pid` on its terminal's stack, i.e. the process
/// that will regain the foreground when `pid` halts.
pub fn parent_on_stack(terminal: TerminalId, pid: ProcessId) -> Option<ProcessId> {
    let stacks = TERMINAL_STACKS.lock();
    let stack = &stacks[terminal.0 as usize];
    let depth = stack.iter().position(|p| *p == Some(pid))?;
    if depth == 0 {
        None
    } else {
        stack[depth - 1]
    }
}

pub fn foreground_of(terminal: TerminalId) -> Option<ProcessId> {
    let stacks = TERMINAL_STACKS.lock();
    stacks[terminal.0 as usize].iter().rev().find_map(|p| *p)
}

pub fn set_current(pid: Option<ProcessId>) {
    *CURRENT.lock() = pid;
}

pub fn current() -> Option<ProcessId> {
    *CURRENT.lock()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{KernelError, ProcessError};

    #[test_case]
    fn a_terminal_cannot_hold_more_than_four_processes() -> Result<(), KernelError> {
        init();
        let t = TerminalId(0);
        let mut parent = None;
        for _ in 0..4 {
            parent = Some(create(parent, t)?);
        }
        match create(parent, t) {
            Err(KernelError::Process(ProcessError::TerminalFull)) => Ok(()),
            other => {
                let _ = other;
                Err(ProcessError::TerminalFull.into())
            }
        }
    }

    #[test_case]
    fn the_global_table_cannot_hold_more_than_six_processes() -> Result<(), KernelError> {
        init();
        // Spread across all three terminals so the per-terminal cap of
        // four is never the one that trips first.
        for t in 0..MAX_TERMINALS {
            create(None, TerminalId(t as u8))?;
            create(None, TerminalId(t as u8))?;
        }
        match create(None, TerminalId(0)) {
            Err(KernelError::Process(ProcessError::TableFull)) => Ok(()),
            other => {
                let _ = other;
                Err(ProcessError::TableFull.into())
            }
        }
    }

    #[test_case]
    fn destroyed_slots_are_reused_lowest_first() -> Result<(), KernelError> {
        init();
        let t = TerminalId(0);
        let first = create(None, t)?;
        let second = create(None, t)?;
        destroy(first);
        let third = create(None, t)?;
        if third != first || second.0 != first.0 + 1 {
            return Err(ProcessError::NotFound { pid: third.0 }.into());
        }
        Ok(())
    }
}
