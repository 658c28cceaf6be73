//! Per-process file descriptor table: 8 slots, the first two pre-wired to
//! the owning terminal for `stdin`/`stdout`, dispatched over a closed set
//! of four device kinds rather than a function-pointer table.

use super::{image::Dentry, rtc::RtcDescriptor};
use crate::{
    error::{FsError, KernelResult},
    process::TerminalId,
};

pub const MAX_FDS: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct RegularFile {
    pub inode: u32,
    pub position: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct DirectoryListing {
    pub position: u32,
}

pub enum FileOps {
    Regular(RegularFile),
    Directory(DirectoryListing),
    Rtc(RtcDescriptor),
    Terminal,
}

pub struct FileDescriptor {
    pub ops: FileOps,
}

pub struct FileTable {
    pub entries: [Option<FileDescriptor>; MAX_FDS],
    pub terminal: TerminalId,
}

impl FileTable {
    pub fn new() -> Self {
        Self {
            entries: [const { None }; MAX_FDS],
            terminal: TerminalId(0),
        }
    }

    /// Wire fd 0/1 to the owning terminal. Called once, right after the
    /// PCB is created.
    pub fn bind_terminal(&mut self, terminal: TerminalId) {
        self.terminal = terminal;
        self.entries[0] = Some(FileDescriptor {
            ops: FileOps::Terminal,
        });
        self.entries[1] = Some(FileDescriptor {
            ops: FileOps::Terminal,
        });
    }

    fn alloc_slot(&self) -> Option<usize> {
        (2..MAX_FDS).find(|&i| self.entries[i].is_none())
    }

    pub fn open(&mut self, name: &[u8]) -> KernelResult<i32> {
        if name.len() > super::image::NAME_LENGTH_MAX {
            return Err(FsError::NameTooLong.into());
        }
        let dentry = super::image::read_dentry_by_name(name).ok_or(FsError::NotFound)?;
        let ops = match dentry.file_type {
            super::image::FileType::Rtc => FileOps::Rtc(RtcDescriptor::open()),
            super::image::FileType::Directory => FileOps::Directory(DirectoryListing { position: 0 }),
            super::image::FileType::Regular => FileOps::Regular(RegularFile {
                inode: dentry.inode_idx,
                position: 0,
            }),
        };
        let slot = self.alloc_slot().ok_or(FsError::NoFreeDescriptor)?;
        self.entries[slot] = Some(FileDescriptor { ops });
        Ok(slot as i32)
    }

    pub fn close(&mut self, fd: i32) -> bool {
        if !(2..MAX_FDS as i32).contains(&fd) {
            return false;
        }
        let fd = fd as usize;
        if self.entries[fd].is_none() {
            return false;
        }
        self.entries[fd] = None;
        true
    }

    pub fn read(&mut self, fd: i32, buf: &mut [u8]) -> KernelResult<usize> {
        let terminal = self.terminal;
        let entry = self.entry_mut(fd)?;
        Ok(match &mut entry.ops {
            FileOps::Terminal => super::terminal_read(terminal, buf),
            FileOps::Rtc(rtc) => {
                rtc.read();
                0
            }
            FileOps::Regular(file) => {
                let n = super::image::read_data(file.inode, file.position, buf);
                file.position += n as u32;
                n
            }
            FileOps::Directory(dir) => {
                let Some(dentry) = super::image::read_dentry_by_index(dir.position as usize) else {
                    return Ok(0);
                };
                dir.position += 1;
                let n = dentry.name_len.min(buf.len());
                buf[..n].copy_from_slice(&dentry.name[..n]);
                // Returns the directory-entry name length, not the number
                // of bytes copied into `buf`; callers rely on this.
                dentry.name_len
            }
        })
    }

    pub fn write(&mut self, fd: i32, buf: &[u8]) -> KernelResult<usize> {
        let terminal = self.terminal;
        let entry = self.entry_mut(fd)?;
        Ok(match &mut entry.ops {
            FileOps::Terminal => super::terminal_write(terminal, buf),
            FileOps::Rtc(rtc) => {
                if buf.len() != 4 {
                    return Err(FsError::NotReadable.into());
                }
                let freq = u32::from_le_bytes(buf.try_into().unwrap()) as u16;
                if rtc.write(freq) {
                    buf.len()
                } else {
                    return Err(FsError::NotReadable.into());
                }
            }
            FileOps::Regular(_) | FileOps::Directory(_) => return Err(FsError::ReadOnly.into()),
        })
    }

    fn entry_mut(&mut self, fd: i32) -> KernelResult<&mut FileDescriptor> {
        if !(0..MAX_FDS as i32).contains(&fd) {
            return Err(FsError::NotFound.into());
        }
        self.entries[fd as usize].as_mut().ok_or_else(|| FsError::NotFound.into())
    }
}

pub fn dentry_for_execute(name: &[u8]) -> Option<Dentry> {
    super::image::read_dentry_by_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KernelError;

    #[test_case]
    fn close_refuses_stdin_and_stdout() -> Result<(), KernelError> {
        let mut table = FileTable::new();
        table.bind_terminal(TerminalId(0));
        if table.close(0) || table.close(1) {
            return Err(FsError::NotFound.into());
        }
        Ok(())
    }

    #[test_case]
    fn close_refuses_an_already_closed_slot() -> Result<(), KernelError> {
        let mut table = FileTable::new();
        table.bind_terminal(TerminalId(0));
        if table.close(2) {
            return Err(FsError::NotFound.into());
        }
        Ok(())
    }

    #[test_case]
    fn regular_files_and_directories_reject_writes() -> Result<(), KernelError> {
        let mut table = FileTable::new();
        table.bind_terminal(TerminalId(0));
        table.entries[2] = Some(FileDescriptor {
            ops: FileOps::Regular(RegularFile { inode: 0, position: 0 }),
        });
        if table.write(2, b"x").is_ok() {
            return Err(FsError::ReadOnly.into());
        }
        Ok(())
    }
}
