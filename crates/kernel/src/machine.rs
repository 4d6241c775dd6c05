//! Contract between the nucleus and the hardware it runs on.

use types::{CpuState, Ticks, WORD_SIZE};

/// Interrupt lines, lowest number first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptLine {
    Ipi = 0,
    CpuTimer = 1,
    IntervalTimer = 2,
    Disk = 3,
    Tape = 4,
    Ethernet = 5,
    Printer = 6,
    Terminal = 7,
}

impl InterruptLine {
    pub const fn from_line(line: u32) -> Option<Self> {
        match line {
            0 => Some(Self::Ipi),
            1 => Some(Self::CpuTimer),
            2 => Some(Self::IntervalTimer),
            3 => Some(Self::Disk),
            4 => Some(Self::Tape),
            5 => Some(Self::Ethernet),
            6 => Some(Self::Printer),
            7 => Some(Self::Terminal),
            _ => None,
        }
    }

    pub const fn is_device(self) -> bool {
        (self as u32) >= (Self::Disk as u32)
    }
}

/// Hardware services consumed by the scheduler and the trap glue.
///
/// `load_state` and `halt` hand the CPU away: on a real board they never
/// return. Hosted implementations record the request and return so the
/// caller can observe the resulting `Transfer`.
pub trait Machine {
    fn load_state(&mut self, state: &CpuState);
    fn halt(&mut self);

    fn interval_timer(&self) -> Ticks;
    fn set_interval_timer(&mut self, ticks: Ticks);
    /// Clock ticks per microsecond.
    fn clock_resolution(&self) -> Ticks;
    /// Low word of the time-of-day clock.
    fn tod_low(&self) -> Ticks;

    fn read_word(&self, addr: u32) -> u32;
    fn write_word(&mut self, addr: u32, value: u32);

    /// Acknowledges the pending interrupt raised on a device line.
    fn acknowledge(&mut self, line: InterruptLine);
    /// Issues `command` to a device register block and waits for completion,
    /// returning the final status word.
    fn device_io(&mut self, command: u32, device: u32, subdevice: u32) -> u32;

    fn fetch_state(&self, addr: u32) -> CpuState {
        let mut words = [0u32; CpuState::WORDS];
        for (i, word) in words.iter_mut().enumerate() {
            *word = self.read_word(addr.wrapping_add(i as u32 * WORD_SIZE));
        }
        CpuState::from_words(&words)
    }

    fn store_state(&mut self, addr: u32, state: &CpuState) {
        for (i, word) in state.to_words().iter().enumerate() {
            self.write_word(addr.wrapping_add(i as u32 * WORD_SIZE), *word);
        }
    }
}
