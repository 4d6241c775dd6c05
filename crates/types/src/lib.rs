#![no_std]

pub mod registers;
pub use registers::Register;

pub mod state;
pub use state::{CpuMode, CpuState, StateConfig};

pub mod syscall;
pub use syscall::ExcType;

/// Interval-timer / clock tick count.
pub type Ticks = u32;

/// Machine word size in bytes.
pub const WORD_SIZE: u32 = 4;
