use kernel::{Config, InterruptLine, Machine};
use types::{CpuState, Register, Ticks};

use crate::memory::Memory;

/// Device status word reported by an idle device.
pub const DEVICE_READY: u32 = 1;

#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub ram_base: u32,
    pub ram_size: usize,
    /// Clock ticks per microsecond.
    pub clock_resolution: Ticks,
    /// Echo kernel log records to stdout.
    pub verbose: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            ram_base: Config::RAM_BASE,
            ram_size: Config::RAM_SIZE as usize,
            clock_resolution: 1,
            verbose: false,
        }
    }
}

/// A single device request issued through WAITIO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoRequest {
    pub command: u32,
    pub device: u32,
    pub subdevice: u32,
}

/// Hosted machine. Loading a state or halting is recorded instead of giving
/// the CPU away. Time only moves through [`Board::advance`], which device
/// requests also call for their configured latency.
pub struct Board {
    config: BoardConfig,
    memory: Memory,
    timer: Ticks,
    tod: Ticks,
    running: Option<CpuState>,
    halted: bool,
    acknowledged: Vec<InterruptLine>,
    io_log: Vec<IoRequest>,
    device_status: u32,
    io_latency: Ticks,
}

impl Board {
    pub fn new(config: BoardConfig) -> Self {
        crate::logger::init(config.verbose);
        Self {
            memory: Memory::new(config.ram_base, config.ram_size),
            config,
            timer: Config::TIMER_MAX,
            tod: 0,
            running: None,
            halted: false,
            acknowledged: Vec::new(),
            io_log: Vec::new(),
            device_status: DEVICE_READY,
            io_latency: 0,
        }
    }

    /// Lets `ticks` pass: the TOD clock moves forward and the interval timer
    /// counts down, stopping at zero.
    pub fn advance(&mut self, ticks: Ticks) {
        self.tod = self.tod.wrapping_add(ticks);
        self.timer = self.timer.saturating_sub(ticks);
    }

    /// State most recently loaded on the CPU, `None` once halted.
    pub fn running(&self) -> Option<&CpuState> {
        self.running.as_ref()
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    pub fn acknowledged(&self) -> &[InterruptLine] {
        &self.acknowledged
    }

    pub fn io_log(&self) -> &[IoRequest] {
        &self.io_log
    }

    /// Status returned by the next WAITIO requests.
    pub fn set_device_status(&mut self, status: u32) {
        self.device_status = status;
    }

    /// Ticks each WAITIO request keeps the CPU waiting.
    pub fn set_io_latency(&mut self, ticks: Ticks) {
        self.io_latency = ticks;
    }

    /// Trap state for the running process issuing syscall `sysno`, with the
    /// program counter still on the trapping instruction.
    pub fn syscall_state(&self, sysno: u32, args: [u32; 3]) -> CpuState {
        let mut state = self.running.unwrap_or_default();
        state.set_reg(Register::A7, sysno);
        state.set_reg(Register::A0, args[0]);
        state.set_reg(Register::A1, args[1]);
        state.set_reg(Register::A2, args[2]);
        state
    }
}

impl Machine for Board {
    fn load_state(&mut self, state: &CpuState) {
        self.running = Some(*state);
    }

    fn halt(&mut self) {
        self.running = None;
        self.halted = true;
    }

    fn interval_timer(&self) -> Ticks {
        self.timer
    }

    fn set_interval_timer(&mut self, ticks: Ticks) {
        self.timer = ticks;
    }

    fn clock_resolution(&self) -> Ticks {
        self.config.clock_resolution
    }

    fn tod_low(&self) -> Ticks {
        self.tod
    }

    fn read_word(&self, addr: u32) -> u32 {
        self.memory.load_u32(addr)
    }

    fn write_word(&mut self, addr: u32, value: u32) {
        self.memory.store_u32(addr, value);
    }

    fn acknowledge(&mut self, line: InterruptLine) {
        self.acknowledged.push(line);
    }

    fn device_io(&mut self, command: u32, device: u32, subdevice: u32) -> u32 {
        self.io_log.push(IoRequest {
            command,
            device,
            subdevice,
        });
        self.advance(self.io_latency);
        self.device_status
    }
}
