#![cfg_attr(not(test), no_std)]
//! Process and synchronization nucleus: PCB pool and process tree, active
//! semaphore list, priority scheduler with aging, and the trap/syscall glue
//! that drives them.

#[macro_use]
pub mod error;
pub use error::{KernelError, KernelResult};

pub mod config;
pub use config::Config;

pub mod machine;
pub use machine::{InterruptLine, Machine};

pub mod pcb;
pub use pcb::{CustomHandler, Pcb, PcbPool, Pid, PidList, ProcQueue, TimeInfo};

pub mod asl;
pub use asl::{Asl, SemKey, Semd};

pub mod scheduler;
pub use scheduler::{CpuTimeReport, Scheduler, Transfer};

pub mod syscall;
pub mod trap;

pub use types::{CpuState, ExcType, Ticks};
