//! Active semaphore list: one descriptor per semaphore that currently has
//! waiters, drawn from a fixed table.

use log::trace;

use crate::pcb::{PcbPool, Pid, PidList, ProcQueue};
use crate::{Config, KernelError, KernelResult};

/// Identity of a semaphore: the guest address of its counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemKey(pub u32);

/// A semaphore with at least one waiter. The descriptor is released as soon
/// as its queue drains.
#[derive(Debug, Clone, Copy, Default)]
pub struct Semd {
    key: Option<SemKey>,
    queue: ProcQueue,
}

impl Semd {
    pub fn key(&self) -> Option<SemKey> {
        self.key
    }

    pub fn queue(&self) -> &ProcQueue {
        &self.queue
    }
}

#[derive(Debug)]
pub struct Asl {
    table: [Semd; Config::MAX_SEM_NO],
    active: usize,
}

impl Default for Asl {
    fn default() -> Self {
        Self::new()
    }
}

impl Asl {
    pub fn new() -> Self {
        Self {
            table: [Semd::default(); Config::MAX_SEM_NO],
            active: 0,
        }
    }

    /// Descriptor of `key`, if some process is blocked on it.
    pub fn find_descriptor(&self, key: SemKey) -> Option<&Semd> {
        self.table.iter().find(|d| d.key == Some(key))
    }

    fn slot_of(&self, key: SemKey) -> Option<usize> {
        self.table.iter().position(|d| d.key == Some(key))
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Blocks `pid` on `key`, allocating a descriptor on first use.
    pub fn insert_blocked(&mut self, pool: &mut PcbPool, key: SemKey, pid: Pid) -> KernelResult<()> {
        if let Some(other) = pool.get(pid).sem_key {
            fatal!("{:?} is already blocked on {:?}", pid, other);
        }
        let slot = match self.slot_of(key) {
            Some(slot) => slot,
            None => {
                let slot = self
                    .table
                    .iter()
                    .position(|d| d.key.is_none())
                    .ok_or(KernelError::ResourceExhausted)?;
                let semd = &mut self.table[slot];
                semd.key = Some(key);
                semd.queue.make_empty();
                self.active += 1;
                trace!("asl: descriptor {:#x} allocated", key.0);
                slot
            }
        };
        pool.get_mut(pid).sem_key = Some(key);
        self.table[slot].queue.push_back(pool, pid);
        Ok(())
    }

    /// Head of the queue of `key` without removing it.
    pub fn head_blocked(&self, key: SemKey) -> Option<Pid> {
        self.find_descriptor(key).and_then(|d| d.queue.head())
    }

    /// Wakes the first waiter on `key`.
    pub fn remove_blocked(&mut self, pool: &mut PcbPool, key: SemKey) -> Option<Pid> {
        let slot = self.slot_of(key)?;
        let pid = self.table[slot].queue.pop_head(pool)?;
        pool.get_mut(pid).sem_key = None;
        self.release_if_idle(slot);
        Some(pid)
    }

    /// Pulls `pid` out of whatever semaphore queue it waits in. `None` if the
    /// process is not blocked.
    pub fn out_blocked(&mut self, pool: &mut PcbPool, pid: Pid) -> Option<Pid> {
        let key = pool.get(pid).sem_key?;
        let Some(slot) = self.slot_of(key) else {
            fatal!("{:?} blocked on {:#x} without a descriptor", pid, key.0);
        };
        if self.table[slot].queue.remove(pool, pid).is_none() {
            fatal!("{:?} missing from the queue of {:#x}", pid, key.0);
        }
        pool.get_mut(pid).sem_key = None;
        self.release_if_idle(slot);
        Some(pid)
    }

    /// Removes every blocked process of the subtree rooted at `root` from
    /// its semaphore queue and returns them. Ready and running processes are
    /// left alone; the tree is not touched.
    pub fn unblock_subtree(&mut self, pool: &mut PcbPool, root: Pid) -> PidList {
        let mut unblocked = PidList::new();
        for &pid in pool.subtree(root).as_slice() {
            if let Some(pid) = self.out_blocked(pool, pid) {
                unblocked.push(pid);
            }
        }
        unblocked
    }

    fn release_if_idle(&mut self, slot: usize) {
        let semd = &mut self.table[slot];
        if semd.queue.is_empty() {
            if let Some(key) = semd.key.take() {
                trace!("asl: descriptor {:#x} released", key.0);
            }
            semd.queue.make_empty();
            self.active -= 1;
        }
    }
}
