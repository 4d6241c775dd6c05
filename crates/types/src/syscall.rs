//! Syscall numbers and exception classes shared by the nucleus and the
//! programs running on top of it.

pub const SYSCALL_GETCPUTIME: u32 = 1;
pub const SYSCALL_CREATEPROCESS: u32 = 2;
pub const SYSCALL_TERMINATEPROCESS: u32 = 3;
pub const SYSCALL_VERHOGEN: u32 = 4;
pub const SYSCALL_PASSEREN: u32 = 5;
pub const SYSCALL_WAITIO: u32 = 6;
pub const SYSCALL_SPECPASSUP: u32 = 7;
pub const SYSCALL_GETPID: u32 = 8;

/// Value written to the return register when a syscall fails.
pub const SYSCALL_ERROR: u32 = -1i32 as u32;

/// Exception classes a process may pass up to its own handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcType {
    Sysbk = 0,
    Tlb = 1,
    Trap = 2,
}

impl ExcType {
    pub const COUNT: usize = 3;

    pub const fn idx(self) -> usize {
        self as usize
    }

    /// Decodes the raw SPECPASSUP type argument.
    pub const fn from_word(word: u32) -> Option<Self> {
        match word {
            0 => Some(ExcType::Sysbk),
            1 => Some(ExcType::Tlb),
            2 => Some(ExcType::Trap),
            _ => None,
        }
    }
}
