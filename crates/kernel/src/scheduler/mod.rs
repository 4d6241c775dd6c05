//! Priority scheduler with linear aging.
//!
//! Every operation that hands the CPU away returns a [`Transfer`] naming the
//! state that was loaded. On the target `Machine::load_state` never returns;
//! on a hosted board the caller observes the transfer instead.

mod passup;
mod semaphore;
mod terminate;

use log::{debug, info};
use types::{CpuMode, CpuState, ExcType, StateConfig, Ticks};

use crate::asl::Asl;
use crate::machine::Machine;
use crate::pcb::{PcbPool, Pid, ProcQueue, TimeInfo};
use crate::{Config, KernelResult};

/// Where control went after a scheduling decision.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// The saved state of this process was loaded.
    Load(Pid),
    /// The process entered its custom handler for this exception class.
    Handler(Pid, ExcType),
    /// Nothing left to run; the machine was halted.
    Halt,
    /// Control stays with the caller, which must still resume the current
    /// process.
    Continue,
}

/// Guest addresses that receive the accumulated CPU times. Zero addresses
/// are skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimeReport {
    pub user_addr: u32,
    pub kernel_addr: u32,
    pub wallclock_addr: u32,
}

pub struct Scheduler<M: Machine> {
    machine: M,
    pool: PcbPool,
    asl: Asl,
    ready: ProcQueue,
    current: Option<Pid>,
    global_age: i32,
}

impl<M: Machine> Scheduler<M> {
    pub fn new(machine: M) -> Self {
        Self {
            machine,
            pool: PcbPool::new(),
            asl: Asl::new(),
            ready: ProcQueue::new(),
            current: None,
            global_age: 0,
        }
    }

    /// Creates a top-level process starting at `entry` in kernel mode.
    pub fn create(&mut self, entry: u32, priority: i32, interrupts_enabled: bool) -> KernelResult<Pid> {
        let pid = self.pool.alloc()?;
        let start = self.machine.tod_low();
        let pcb = self.pool.get_mut(pid);
        pcb.state.configure(StateConfig {
            mode: CpuMode::Kernel,
            virtual_memory: false,
            fast_interrupts: true,
            interrupts: interrupts_enabled,
        });
        pcb.state.pc = entry;
        pcb.state.set_sp(Config::RAM_TOP - Config::STACK_SIZE * pid.to_word());
        pcb.priority = priority;
        pcb.original_priority = priority;
        pcb.times.start_tod = start;
        self.ready.insert(&mut self.pool, pid);
        info!("create {:?} entry=0x{:08x} priority={}", pid, entry, priority);
        Ok(pid)
    }

    /// Creates a child of the running process from a copy of `state`.
    pub fn create_child(&mut self, state: &CpuState, priority: i32) -> KernelResult<Pid> {
        let parent = self.require_current();
        let pid = self.pool.alloc()?;
        let start = self.machine.tod_low();
        let pcb = self.pool.get_mut(pid);
        pcb.state = *state;
        pcb.priority = priority;
        pcb.original_priority = priority;
        pcb.times.start_tod = start;
        self.pool.insert_child(parent, pid);
        self.ready.insert(&mut self.pool, pid);
        info!("create {:?} child of {:?} priority={}", pid, parent, priority);
        Ok(pid)
    }

    /// Hands the CPU to the highest-priority ready process, or halts when
    /// there is none.
    pub fn dispatch(&mut self) -> Transfer {
        if let Some(pid) = self.current {
            fatal!("dispatch while {:?} is running", pid);
        }
        let Some(next) = self.ready.pop_head(&mut self.pool) else {
            debug!("ready queue empty, halting");
            self.machine.halt();
            return Transfer::Halt;
        };
        self.ready.for_each_mut(&mut self.pool, |pcb| {
            pcb.priority = pcb.priority.saturating_add(1);
        });
        self.global_age = self.global_age.wrapping_add(1);

        let slice = self.full_slice();
        self.machine.set_interval_timer(slice);
        let pcb = self.pool.get_mut(next);
        pcb.times.slice_mark = slice;
        self.current = Some(next);
        debug!(
            "dispatch {:?} priority={} age={}",
            next, pcb.priority, self.global_age
        );
        self.machine.load_state(&pcb.state);
        Transfer::Load(next)
    }

    /// Returns to the running process for the rest of its slice.
    pub fn resume(&mut self, state: &CpuState, time_left: Ticks, handler_time: Ticks) -> Transfer {
        self.resume_reporting(state, time_left, handler_time, None)
    }

    /// Like [`Scheduler::resume`], additionally writing the updated CPU
    /// times of the running process to the guest addresses in `report`.
    pub fn resume_reporting(
        &mut self,
        state: &CpuState,
        time_left: Ticks,
        handler_time: Ticks,
        report: Option<CpuTimeReport>,
    ) -> Transfer {
        let pid = self.require_current();
        self.charge(pid, time_left, handler_time);
        let now = self.machine.tod_low();
        let pcb = self.pool.get_mut(pid);
        pcb.state = *state;
        pcb.times.slice_mark = time_left;
        let times = pcb.times;

        if let Some(report) = report {
            let wallclock = now.wrapping_sub(times.start_tod);
            for (addr, value) in [
                (report.user_addr, times.user),
                (report.kernel_addr, times.kernel),
                (report.wallclock_addr, wallclock),
            ] {
                if addr != 0 {
                    self.machine.write_word(addr, value);
                }
            }
        }

        self.machine.set_interval_timer(time_left);
        self.machine.load_state(&self.pool.get(pid).state);
        Transfer::Load(pid)
    }

    /// Preempts the running process at the end of its slice.
    pub fn context_switch(&mut self, state: &CpuState, time_left: Ticks, handler_time: Ticks) -> Transfer {
        let pid = self.require_current();
        self.charge(pid, time_left, handler_time);
        let pcb = self.pool.get_mut(pid);
        pcb.state = *state;
        pcb.priority = pcb.original_priority;
        self.ready.insert(&mut self.pool, pid);
        self.current = None;
        debug!("slice expired for {:?}", pid);
        self.dispatch()
    }

    pub fn current(&self) -> Option<Pid> {
        self.current
    }

    pub fn current_parent(&self) -> Option<Pid> {
        self.current.and_then(|pid| self.pool.parent(pid))
    }

    pub fn cpu_times(&self, pid: Pid) -> TimeInfo {
        self.pool.get(pid).times
    }

    pub fn priority(&self, pid: Pid) -> i32 {
        self.pool.get(pid).priority
    }

    pub fn ready(&self) -> &ProcQueue {
        &self.ready
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    pub fn global_age(&self) -> i32 {
        self.global_age
    }

    pub fn pool(&self) -> &PcbPool {
        &self.pool
    }

    pub fn asl(&self) -> &Asl {
        &self.asl
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }

    fn full_slice(&self) -> Ticks {
        Config::TIME_SLICE_US.saturating_mul(self.machine.clock_resolution())
    }

    fn require_current(&self) -> Pid {
        match self.current {
            Some(pid) => pid,
            None => fatal!("no running process"),
        }
    }

    /// Bills the time since the last hand-off: slice consumed as user time,
    /// handler time as kernel time.
    fn charge(&mut self, pid: Pid, time_left: Ticks, handler_time: Ticks) {
        let times = &mut self.pool.get_mut(pid).times;
        times.user = times
            .user
            .wrapping_add(times.slice_mark.saturating_sub(time_left));
        times.kernel = times.kernel.wrapping_add(handler_time);
    }
}
