use log::{debug, trace};
use types::{CpuState, Ticks};

use super::{Scheduler, Transfer};
use crate::asl::SemKey;
use crate::machine::Machine;

impl<M: Machine> Scheduler<M> {
    /// P operation on the counter at `key`. Blocks the running process when
    /// the counter is not positive.
    pub fn passeren(&mut self, key: SemKey, state: &CpuState, time_left: Ticks, handler_time: Ticks) -> Transfer {
        let count = self.machine.read_word(key.0) as i32;
        if count > 0 {
            self.machine.write_word(key.0, (count - 1) as u32);
            trace!("P {:#x}: {} -> {}", key.0, count, count - 1);
            return self.resume(state, time_left, handler_time);
        }

        let pid = self.require_current();
        self.charge(pid, time_left, handler_time);
        let global_age = self.global_age;
        let pcb = self.pool.get_mut(pid);
        pcb.priority = global_age.wrapping_sub(pcb.priority);
        pcb.state = *state;
        if let Err(err) = self.asl.insert_blocked(&mut self.pool, key, pid) {
            fatal!("cannot block {:?} on {:#x}: {}", pid, key.0, err);
        }
        self.current = None;
        debug!("{:?} blocked on {:#x}", pid, key.0);
        self.dispatch()
    }

    /// V operation on the counter at `key`. Wakes the oldest waiter if there
    /// is one; never switches away from the running process.
    pub fn verhogen(&mut self, key: SemKey) {
        match self.asl.remove_blocked(&mut self.pool, key) {
            Some(pid) => {
                let global_age = self.global_age;
                let pcb = self.pool.get_mut(pid);
                pcb.priority = global_age.wrapping_sub(pcb.priority);
                self.ready.insert(&mut self.pool, pid);
                debug!("{:?} woken from {:#x}", pid, key.0);
            }
            None => {
                let count = self.machine.read_word(key.0) as i32;
                self.machine.write_word(key.0, count.wrapping_add(1) as u32);
                trace!("V {:#x}: {} -> {}", key.0, count, count.wrapping_add(1));
            }
        }
    }
}
