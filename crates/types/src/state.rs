use core::fmt;

use crate::Register;

/// Status bit: CPU runs in user mode when set, kernel mode when clear.
pub const STATUS_USER_MODE: u32 = 1 << 0;
/// Status bit: virtual address translation enabled.
pub const STATUS_VM: u32 = 1 << 1;
/// Status bit: fast interrupts (IPI, CPU timer, interval timer) unmasked.
pub const STATUS_FAST_INT: u32 = 1 << 2;
/// Status bit: device interrupts (disk, tape, network, printer, terminal) unmasked.
pub const STATUS_INT: u32 = 1 << 3;

/// Processor privilege mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuMode {
    #[default]
    Kernel,
    User,
}

/// Mode and interrupt configuration applied to a `CpuState` in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateConfig {
    pub mode: CpuMode,
    pub virtual_memory: bool,
    pub fast_interrupts: bool,
    pub interrupts: bool,
}

/// Saved processor state: general-purpose registers, program counter and
/// the status word. The nucleus treats it as an opaque blob except for the
/// accessors below.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuState {
    /// General-purpose registers x0-x31.
    pub regs: [u32; 32],
    /// Program counter to resume at.
    pub pc: u32,
    /// Mode and interrupt-mask bits (`STATUS_*`).
    pub status: u32,
}

impl fmt::Debug for CpuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuState")
            .field("pc", &format_args!("0x{:08x}", self.pc))
            .field("sp", &format_args!("0x{:08x}", self.sp()))
            .field("status", &format_args!("0b{:04b}", self.status))
            .finish()
    }
}

impl CpuState {
    /// Number of 32-bit words occupied by a state in guest memory.
    pub const WORDS: usize = 34;

    /// Kernel mode, every interrupt masked, translation off.
    pub fn cleared() -> Self {
        let mut state = Self::default();
        state.clear();
        state
    }

    pub fn configure(&mut self, config: StateConfig) {
        let mut status = 0;
        if config.mode == CpuMode::User {
            status |= STATUS_USER_MODE;
        }
        if config.virtual_memory {
            status |= STATUS_VM;
        }
        if config.fast_interrupts {
            status |= STATUS_FAST_INT;
        }
        if config.interrupts {
            status |= STATUS_INT;
        }
        self.status = status;
    }

    pub fn clear(&mut self) {
        self.configure(StateConfig::default());
    }

    pub fn config(&self) -> StateConfig {
        StateConfig {
            mode: if self.status & STATUS_USER_MODE != 0 {
                CpuMode::User
            } else {
                CpuMode::Kernel
            },
            virtual_memory: self.status & STATUS_VM != 0,
            fast_interrupts: self.status & STATUS_FAST_INT != 0,
            interrupts: self.status & STATUS_INT != 0,
        }
    }

    #[inline]
    pub fn reg(&self, reg: Register) -> u32 {
        self.regs[reg.idx()]
    }

    #[inline]
    pub fn set_reg(&mut self, reg: Register, value: u32) {
        if reg != Register::Zero {
            self.regs[reg.idx()] = value;
        }
    }

    pub fn sp(&self) -> u32 {
        self.reg(Register::Sp)
    }

    pub fn set_sp(&mut self, sp: u32) {
        self.set_reg(Register::Sp, sp);
    }

    /// Syscall number (a7).
    pub fn sysno(&self) -> u32 {
        self.reg(Register::A7)
    }

    /// Syscall arguments (a0, a1, a2).
    pub fn sys_args(&self) -> [u32; 3] {
        [
            self.reg(Register::A0),
            self.reg(Register::A1),
            self.reg(Register::A2),
        ]
    }

    pub fn set_sys_return(&mut self, value: u32) {
        self.set_reg(Register::A0, value);
    }

    pub fn sys_return(&self) -> u32 {
        self.reg(Register::A0)
    }

    /// Flattens the state into guest words: x0-x31, pc, status.
    pub fn to_words(&self) -> [u32; Self::WORDS] {
        let mut words = [0u32; Self::WORDS];
        words[..32].copy_from_slice(&self.regs);
        words[32] = self.pc;
        words[33] = self.status;
        words
    }

    pub fn from_words(words: &[u32; Self::WORDS]) -> Self {
        let mut regs = [0u32; 32];
        regs.copy_from_slice(&words[..32]);
        regs[0] = 0;
        Self {
            regs,
            pc: words[32],
            status: words[33],
        }
    }
}
