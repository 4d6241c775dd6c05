//! Exception entry points. Each call serves one decoded event for the running
//! process and returns where control went.
//!
//! On entry the interval timer still holds what was left of the slice. It is
//! read, then reloaded with `Config::TIMER_MAX` so the time spent in the
//! handler can be measured against it.

use log::trace;
use types::{CpuState, ExcType, Ticks, WORD_SIZE};

use crate::machine::{InterruptLine, Machine};
use crate::scheduler::{Scheduler, Transfer};
use crate::syscall::dispatch_syscall;
use crate::Config;

fn enter<M: Machine>(sched: &mut Scheduler<M>) -> Ticks {
    let machine = sched.machine_mut();
    let time_left = machine.interval_timer();
    machine.set_interval_timer(Config::TIMER_MAX);
    time_left
}

/// Ticks spent in the handler since `enter`.
pub(crate) fn handler_time<M: Machine>(sched: &Scheduler<M>) -> Ticks {
    Config::TIMER_MAX.wrapping_sub(sched.machine().interval_timer())
}

/// Interrupt raised on `line` while `state` was running.
pub fn interrupt<M: Machine>(sched: &mut Scheduler<M>, line: u32, state: CpuState) -> Transfer {
    let time_left = enter(sched);
    trace!("interrupt line {} time_left={}", line, time_left);
    match InterruptLine::from_line(line) {
        Some(InterruptLine::IntervalTimer) => {
            let spent = handler_time(sched);
            sched.context_switch(&state, time_left, spent)
        }
        Some(dev) if dev.is_device() => {
            sched.machine_mut().acknowledge(dev);
            let spent = handler_time(sched);
            sched.resume(&state, time_left, spent)
        }
        Some(other) => fatal!("unexpected interrupt on {:?}", other),
        None => fatal!("unknown interrupt line {}", line),
    }
}

/// Syscall or breakpoint trap. `state.pc` points at the trapping instruction.
pub fn sysbk<M: Machine>(sched: &mut Scheduler<M>, mut state: CpuState) -> Transfer {
    let time_left = enter(sched);
    state.pc = state.pc.wrapping_add(WORD_SIZE);
    trace!("syscall {} from pc=0x{:08x}", state.sysno(), state.pc);
    dispatch_syscall(sched, state, time_left)
}

/// Address translation fault.
pub fn tlb<M: Machine>(sched: &mut Scheduler<M>, state: CpuState) -> Transfer {
    pass_up(sched, ExcType::Tlb, state)
}

/// Program trap (illegal instruction, misaligned access and the like).
pub fn program_trap<M: Machine>(sched: &mut Scheduler<M>, state: CpuState) -> Transfer {
    pass_up(sched, ExcType::Trap, state)
}

fn pass_up<M: Machine>(sched: &mut Scheduler<M>, exc: ExcType, state: CpuState) -> Transfer {
    let time_left = enter(sched);
    trace!("{:?} exception at pc=0x{:08x}", exc, state.pc);
    let spent = handler_time(sched);
    sched.call_custom_handler(exc, &state, time_left, spent)
}
