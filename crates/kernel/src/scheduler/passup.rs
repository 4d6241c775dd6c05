use log::debug;
use types::{CpuState, ExcType, Ticks};

use super::{Scheduler, Transfer};
use crate::machine::Machine;
use crate::pcb::CustomHandler;
use crate::{KernelError, KernelResult};

impl<M: Machine> Scheduler<M> {
    /// Registers the running process's own handler for `exc`. Each class can
    /// be registered once per process.
    pub fn register_custom_handler(&mut self, exc: ExcType, save_area: u32, handler_entry: u32) -> KernelResult<()> {
        let pid = self.require_current();
        let slot = &mut self.pool.get_mut(pid).handlers[exc.idx()];
        if slot.is_some() {
            return Err(KernelError::AlreadyRegistered);
        }
        *slot = Some(CustomHandler {
            save_area,
            handler_entry,
        });
        debug!("{:?} registered {:?} handler at 0x{:08x}", pid, exc, handler_entry);
        Ok(())
    }

    /// Passes an exception up to the running process's handler, or
    /// terminates the process when it has none for `exc`.
    pub fn call_custom_handler(
        &mut self,
        exc: ExcType,
        state: &CpuState,
        time_left: Ticks,
        handler_time: Ticks,
    ) -> Transfer {
        let pid = self.require_current();
        let Some(handler) = self.pool.get(pid).handlers[exc.idx()] else {
            debug!("{:?} has no {:?} handler, terminating", pid, exc);
            return self.terminate(pid, state);
        };

        self.charge(pid, time_left, handler_time);
        self.machine.store_state(handler.save_area, state);
        let entry = self.machine.fetch_state(handler.handler_entry);

        let slice = self.full_slice();
        self.machine.set_interval_timer(slice);
        let pcb = self.pool.get_mut(pid);
        pcb.state = entry;
        pcb.times.slice_mark = slice;
        debug!("{:?} enters {:?} handler at 0x{:08x}", pid, exc, entry.pc);
        self.machine.load_state(&entry);
        Transfer::Handler(pid, exc)
    }
}
