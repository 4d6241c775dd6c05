//! System call dispatch. The number is taken from `a7`, arguments from
//! `a0..a2`; results go back in `a0`.
//!
//! Handler time is read from the interval timer only when control is about
//! to leave the handler, so work such as a device wait is billed to the
//! caller as kernel time.

use log::{debug, warn};
use types::syscall::{
    SYSCALL_CREATEPROCESS, SYSCALL_ERROR, SYSCALL_GETCPUTIME, SYSCALL_GETPID, SYSCALL_PASSEREN,
    SYSCALL_SPECPASSUP, SYSCALL_TERMINATEPROCESS, SYSCALL_VERHOGEN, SYSCALL_WAITIO,
};
use types::{CpuState, ExcType, Ticks};

use crate::asl::SemKey;
use crate::machine::Machine;
use crate::pcb::Pid;
use crate::scheduler::{CpuTimeReport, Scheduler, Transfer};
use crate::trap::handler_time;
use crate::KernelError;

/// Serves the syscall described by `state`. The program counter in `state`
/// must already point past the trapping instruction.
pub fn dispatch_syscall<M: Machine>(
    sched: &mut Scheduler<M>,
    mut state: CpuState,
    time_left: Ticks,
) -> Transfer {
    let args = state.sys_args();
    match state.sysno() {
        SYSCALL_GETCPUTIME => sys_get_cpu_time(sched, &state, args, time_left),
        SYSCALL_CREATEPROCESS => {
            let ret = sys_create_process(sched, &state, args);
            state.set_sys_return(ret);
            resume(sched, &state, time_left)
        }
        SYSCALL_TERMINATEPROCESS => sys_terminate_process(sched, state, args, time_left),
        SYSCALL_VERHOGEN => {
            sched.verhogen(SemKey(args[0]));
            resume(sched, &state, time_left)
        }
        SYSCALL_PASSEREN => {
            let spent = handler_time(sched);
            sched.passeren(SemKey(args[0]), &state, time_left, spent)
        }
        SYSCALL_WAITIO => {
            let status = sched.machine_mut().device_io(args[0], args[1], args[2]);
            debug!("sys_waitio: cmd=0x{:x} dev=0x{:08x} status=0x{:x}", args[0], args[1], status);
            state.set_sys_return(status);
            resume(sched, &state, time_left)
        }
        SYSCALL_SPECPASSUP => sys_spec_passup(sched, state, args, time_left),
        SYSCALL_GETPID => {
            sys_get_pid(sched, args);
            resume(sched, &state, time_left)
        }
        other => {
            debug!("syscall {} passed up", other);
            let spent = handler_time(sched);
            sched.call_custom_handler(ExcType::Sysbk, &state, time_left, spent)
        }
    }
}

fn sys_get_cpu_time<M: Machine>(
    sched: &mut Scheduler<M>,
    state: &CpuState,
    args: [u32; 3],
    time_left: Ticks,
) -> Transfer {
    let report = CpuTimeReport {
        user_addr: args[0],
        kernel_addr: args[1],
        wallclock_addr: args[2],
    };
    let spent = handler_time(sched);
    sched.resume_reporting(state, time_left, spent, Some(report))
}

fn resume<M: Machine>(sched: &mut Scheduler<M>, state: &CpuState, time_left: Ticks) -> Transfer {
    let spent = handler_time(sched);
    sched.resume(state, time_left, spent)
}

fn sys_create_process<M: Machine>(sched: &mut Scheduler<M>, state: &CpuState, args: [u32; 3]) -> u32 {
    let child_state = sched.machine().fetch_state(args[0]);
    let priority = args[1] as i32;
    match sched.create_child(&child_state, priority) {
        Ok(pid) => {
            if args[2] != 0 {
                sched.machine_mut().write_word(args[2], pid.to_word());
            }
            0
        }
        Err(err) => {
            warn!("sys_create_process: pc=0x{:08x}: {}", state.pc, err);
            SYSCALL_ERROR
        }
    }
}

fn sys_terminate_process<M: Machine>(
    sched: &mut Scheduler<M>,
    mut state: CpuState,
    args: [u32; 3],
    time_left: Ticks,
) -> Transfer {
    let target = match args[0] {
        0 => Ok(None),
        word => Pid::from_word(word).map(Some).ok_or(KernelError::NoSuchProcess),
    };
    match target.and_then(|target| sched.drop_process(target, &state)) {
        Ok(Transfer::Continue) => state.set_sys_return(0),
        Ok(transfer) => return transfer,
        Err(err) => {
            warn!("sys_terminate_process: pid {}: {}", args[0], err);
            state.set_sys_return(SYSCALL_ERROR);
        }
    }
    resume(sched, &state, time_left)
}

fn sys_spec_passup<M: Machine>(
    sched: &mut Scheduler<M>,
    mut state: CpuState,
    args: [u32; 3],
    time_left: Ticks,
) -> Transfer {
    let registered = ExcType::from_word(args[0])
        .ok_or(KernelError::InvalidExceptionType(args[0]))
        .and_then(|exc| sched.register_custom_handler(exc, args[1], args[2]));
    match registered {
        Ok(()) => {
            state.set_sys_return(0);
            resume(sched, &state, time_left)
        }
        Err(err) => {
            warn!("sys_spec_passup: {}, terminating caller", err);
            state.set_sys_return(SYSCALL_ERROR);
            match sched.drop_process(None, &state) {
                Ok(transfer) => transfer,
                Err(err) => fatal!("cannot terminate caller: {}", err),
            }
        }
    }
}

fn sys_get_pid<M: Machine>(sched: &mut Scheduler<M>, args: [u32; 3]) {
    let pid = sched.current().map_or(0, Pid::to_word);
    let ppid = sched.current_parent().map_or(0, Pid::to_word);
    if args[0] != 0 {
        sched.machine_mut().write_word(args[0], pid);
    }
    if args[1] != 0 {
        sched.machine_mut().write_word(args[1], ppid);
    }
}
