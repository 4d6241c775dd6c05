use types::Ticks;

/// Compile-time limits and machine constants of the nucleus.
pub struct Config;

impl Config {
    /// Capacity of the PCB pool.
    pub const MAX_PROC: usize = 20;
    /// Maximum number of semaphores with waiters at the same time.
    pub const MAX_SEM_NO: usize = 20;
    /// Length of a scheduling slice in microseconds.
    pub const TIME_SLICE_US: Ticks = 3000;
    /// Bytes of stack reserved for each process below `RAM_TOP`.
    pub const STACK_SIZE: u32 = 1024;
    pub const RAM_BASE: u32 = 0x2000_0000;
    pub const RAM_SIZE: u32 = 0x0010_0000;
    pub const RAM_TOP: u32 = Self::RAM_BASE + Self::RAM_SIZE;
    /// Interval timer value loaded on handler entry; elapsed handler time is
    /// measured against it.
    pub const TIMER_MAX: Ticks = Ticks::MAX;
    pub const DEFAULT_PRIORITY: i32 = 1;
}
