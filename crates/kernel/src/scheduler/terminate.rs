use log::{info, trace};
use types::CpuState;

use super::{Scheduler, Transfer};
use crate::machine::Machine;
use crate::pcb::Pid;
use crate::{KernelError, KernelResult};

/// Priority given to the running process while it is parked in the ready
/// queue during a termination, so it stays at the head.
const PLACEHOLDER_PRIORITY: i32 = i32::MAX;

impl<M: Machine> Scheduler<M> {
    /// Terminates `target` (the running process when `None`) together with
    /// all of its descendants.
    ///
    /// Returns [`Transfer::Continue`] when the running process survives; the
    /// caller then resumes it. Otherwise the next process has already been
    /// dispatched.
    pub fn drop_process(&mut self, target: Option<Pid>, state: &CpuState) -> KernelResult<Transfer> {
        let target = match target {
            Some(pid) if !self.pool.is_live(pid) => return Err(KernelError::NoSuchProcess),
            Some(pid) => pid,
            None => self.require_current(),
        };
        Ok(self.terminate(target, state))
    }

    pub(super) fn terminate(&mut self, target: Pid, state: &CpuState) -> Transfer {
        let current = self.require_current();

        let pcb = self.pool.get_mut(current);
        pcb.state = *state;
        let saved_priority = pcb.priority;
        pcb.priority = PLACEHOLDER_PRIORITY;
        self.ready.insert(&mut self.pool, current);

        self.pool.detach(target);
        let unblocked = self.asl.unblock_subtree(&mut self.pool, target);
        let doomed = self.pool.subtree(target);
        // Leaves first so every parent outlives its children.
        for &pid in doomed.as_slice().iter().rev() {
            self.pool.detach(pid);
            if self.ready.remove(&mut self.pool, pid).is_none() && !unblocked.contains(pid) {
                fatal!("{:?} is neither ready nor blocked", pid);
            }
            self.pool.free(pid);
            trace!("freed {:?}", pid);
        }
        info!("terminated {:?} and {} descendant(s)", target, doomed.len() - 1);

        if !self.pool.is_live(current) {
            self.current = None;
            return self.dispatch();
        }

        if self.ready.head() == Some(current) {
            self.ready.pop_head(&mut self.pool);
        } else {
            // Another process holds the placeholder priority; pull ours out
            // and keep running it.
            self.ready.remove(&mut self.pool, current);
        }
        self.pool.get_mut(current).priority = saved_priority;
        Transfer::Continue
    }
}
