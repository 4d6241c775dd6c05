//! Process control blocks: a fixed arena of PCB slots, index-linked process
//! queues and the parent/children relation.
//!
//! A `Pid` is the index of a slot in the arena. Queue links (`next`/`prev`)
//! are shared by every queue a PCB can sit in (free list, ready queue, a
//! semaphore queue) since a PCB is in at most one of them at a time. Tree
//! links are independent of queue links.

use core::fmt;

use log::trace;
use types::{CpuState, ExcType, Ticks};

use crate::asl::SemKey;
use crate::{Config, KernelError, KernelResult};

/// Handle of a process: the index of its slot in the PCB arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(u8);

impl Pid {
    const fn from_index(idx: usize) -> Self {
        Pid(idx as u8)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Identifier exposed to processes. Zero is reserved for "none".
    pub const fn to_word(self) -> u32 {
        self.0 as u32 + 1
    }

    pub const fn from_word(word: u32) -> Option<Self> {
        if word == 0 || word as usize > Config::MAX_PROC {
            None
        } else {
            Some(Pid((word - 1) as u8))
        }
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid{}", self.to_word())
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_word())
    }
}

/// Guest addresses registered through SPECPASSUP for one exception class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomHandler {
    /// Where the faulting state is copied before the handler runs.
    pub save_area: u32,
    /// State loaded to run the handler.
    pub handler_entry: u32,
}

/// Per-process CPU accounting, in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeInfo {
    /// TOD low word when the process was created.
    pub start_tod: Ticks,
    pub user: Ticks,
    pub kernel: Ticks,
    /// Interval timer value when control last went back to the process.
    pub slice_mark: Ticks,
}

#[derive(Debug, Clone, Default)]
pub struct Pcb {
    pub state: CpuState,
    pub priority: i32,
    pub original_priority: i32,
    /// Semaphore the process is blocked on.
    pub sem_key: Option<SemKey>,
    pub handlers: [Option<CustomHandler>; ExcType::COUNT],
    pub times: TimeInfo,

    in_use: bool,
    queued: bool,
    next: Option<Pid>,
    prev: Option<Pid>,

    parent: Option<Pid>,
    first_child: Option<Pid>,
    last_child: Option<Pid>,
    next_sib: Option<Pid>,
    prev_sib: Option<Pid>,
}

impl Pcb {
    pub fn parent(&self) -> Option<Pid> {
        self.parent
    }

    pub fn is_queued(&self) -> bool {
        self.queued
    }
}

/// FIFO-linked sequence of PCBs threaded through the arena.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcQueue {
    head: Option<Pid>,
    tail: Option<Pid>,
    len: usize,
}

impl ProcQueue {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Resets the queue. Only valid when no PCB is linked into it.
    pub fn make_empty(&mut self) {
        debug_assert!(self.len == 0, "make_empty on a populated queue");
        *self = Self::new();
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn head(&self) -> Option<Pid> {
        self.head
    }

    /// Inserts `pid` ordered by descending priority, after every entry of
    /// equal priority.
    pub fn insert(&mut self, pool: &mut PcbPool, pid: Pid) {
        let priority = pool.get(pid).priority;
        let mut cursor = self.head;
        while let Some(at) = cursor {
            if priority > pool.get(at).priority {
                self.link_before(pool, pid, at);
                return;
            }
            cursor = pool.get(at).next;
        }
        self.push_back(pool, pid);
    }

    /// Appends `pid` regardless of priority.
    pub fn push_back(&mut self, pool: &mut PcbPool, pid: Pid) {
        let prev = self.tail;
        {
            let pcb = pool.slot_mut(pid);
            if pcb.queued {
                fatal!("{:?} is already linked into a queue", pid);
            }
            pcb.queued = true;
            pcb.prev = prev;
            pcb.next = None;
        }
        match prev {
            Some(tail) => pool.slot_mut(tail).next = Some(pid),
            None => self.head = Some(pid),
        }
        self.tail = Some(pid);
        self.len += 1;
    }

    pub fn pop_head(&mut self, pool: &mut PcbPool) -> Option<Pid> {
        let head = self.head?;
        self.unlink(pool, head);
        Some(head)
    }

    /// Removes `pid` from anywhere in the queue. `None` if it is not linked
    /// into this queue.
    pub fn remove(&mut self, pool: &mut PcbPool, pid: Pid) -> Option<Pid> {
        if !self.contains(pool, pid) {
            return None;
        }
        self.unlink(pool, pid);
        Some(pid)
    }

    pub fn contains(&self, pool: &PcbPool, pid: Pid) -> bool {
        self.iter(pool).any(|p| p == pid)
    }

    pub fn iter<'a>(&self, pool: &'a PcbPool) -> QueueIter<'a> {
        QueueIter {
            pool,
            cursor: self.head,
        }
    }

    /// Applies `f` to every queued PCB, head first.
    pub fn for_each_mut(&self, pool: &mut PcbPool, mut f: impl FnMut(&mut Pcb)) {
        let mut cursor = self.head;
        while let Some(pid) = cursor {
            let pcb = pool.slot_mut(pid);
            f(pcb);
            cursor = pcb.next;
        }
    }

    fn link_before(&mut self, pool: &mut PcbPool, pid: Pid, at: Pid) {
        let prev = pool.get(at).prev;
        {
            let pcb = pool.slot_mut(pid);
            if pcb.queued {
                fatal!("{:?} is already linked into a queue", pid);
            }
            pcb.queued = true;
            pcb.prev = prev;
            pcb.next = Some(at);
        }
        pool.slot_mut(at).prev = Some(pid);
        match prev {
            Some(p) => pool.slot_mut(p).next = Some(pid),
            None => self.head = Some(pid),
        }
        self.len += 1;
    }

    fn unlink(&mut self, pool: &mut PcbPool, pid: Pid) {
        let (prev, next) = {
            let pcb = pool.slot_mut(pid);
            let links = (pcb.prev, pcb.next);
            pcb.prev = None;
            pcb.next = None;
            pcb.queued = false;
            links
        };
        match prev {
            Some(p) => pool.slot_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => pool.slot_mut(n).prev = prev,
            None => self.tail = prev,
        }
        self.len -= 1;
    }
}

pub struct QueueIter<'a> {
    pool: &'a PcbPool,
    cursor: Option<Pid>,
}

impl Iterator for QueueIter<'_> {
    type Item = Pid;

    fn next(&mut self) -> Option<Pid> {
        let pid = self.cursor?;
        self.cursor = self.pool.slot(pid).next;
        Some(pid)
    }
}

/// Children of one process, oldest first.
pub struct Children<'a> {
    pool: &'a PcbPool,
    cursor: Option<Pid>,
}

impl Iterator for Children<'_> {
    type Item = Pid;

    fn next(&mut self) -> Option<Pid> {
        let pid = self.cursor?;
        self.cursor = self.pool.slot(pid).next_sib;
        Some(pid)
    }
}

/// Fixed-capacity list of pids, sized to hold every process at once.
#[derive(Clone, Copy)]
pub struct PidList {
    items: [Pid; Config::MAX_PROC],
    len: usize,
}

impl PidList {
    pub const fn new() -> Self {
        Self {
            items: [Pid(0); Config::MAX_PROC],
            len: 0,
        }
    }

    pub fn push(&mut self, pid: Pid) {
        if self.len == Config::MAX_PROC {
            fatal!("pid list overflow");
        }
        self.items[self.len] = pid;
        self.len += 1;
    }

    pub fn pop(&mut self) -> Option<Pid> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.items[self.len])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[Pid] {
        &self.items[..self.len]
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.as_slice().contains(&pid)
    }
}

impl Default for PidList {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PidList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// Arena of every PCB the nucleus can hand out.
pub struct PcbPool {
    table: [Pcb; Config::MAX_PROC],
    free: ProcQueue,
}

impl fmt::Debug for PcbPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcbPool")
            .field("capacity", &Config::MAX_PROC)
            .field("free", &self.free.len())
            .finish()
    }
}

impl Default for PcbPool {
    fn default() -> Self {
        Self::new()
    }
}

impl PcbPool {
    pub fn new() -> Self {
        let mut pool = Self {
            table: core::array::from_fn(|_| Pcb::default()),
            free: ProcQueue::new(),
        };
        let mut free = ProcQueue::new();
        for idx in 0..Config::MAX_PROC {
            free.push_back(&mut pool, Pid::from_index(idx));
        }
        pool.free = free;
        pool
    }

    /// Takes a blank PCB out of the free list.
    pub fn alloc(&mut self) -> KernelResult<Pid> {
        let mut free = self.free;
        let pid = free.pop_head(self);
        self.free = free;
        let pid = pid.ok_or(KernelError::ResourceExhausted)?;
        let pcb = self.slot_mut(pid);
        *pcb = Pcb::default();
        pcb.in_use = true;
        trace!("pcb alloc {:?}", pid);
        Ok(pid)
    }

    /// Returns `pid` to the free list. The PCB must already be out of every
    /// queue and detached from the process tree.
    pub fn free(&mut self, pid: Pid) {
        let pcb = self.slot(pid);
        if !pcb.in_use {
            fatal!("double free of {:?}", pid);
        }
        debug_assert!(!pcb.queued, "freeing a queued pcb");
        debug_assert!(pcb.sem_key.is_none(), "freeing a blocked pcb");
        debug_assert!(pcb.parent.is_none(), "freeing a pcb with a parent");
        debug_assert!(pcb.first_child.is_none(), "freeing a pcb with children");
        self.slot_mut(pid).in_use = false;
        let mut free = self.free;
        free.push_back(self, pid);
        self.free = free;
        trace!("pcb free {:?}", pid);
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn is_live(&self, pid: Pid) -> bool {
        self.slot(pid).in_use
    }

    pub fn get(&self, pid: Pid) -> &Pcb {
        let pcb = self.slot(pid);
        debug_assert!(pcb.in_use, "access to free pcb");
        pcb
    }

    pub fn get_mut(&mut self, pid: Pid) -> &mut Pcb {
        let pcb = self.slot_mut(pid);
        debug_assert!(pcb.in_use, "access to free pcb");
        pcb
    }

    fn slot(&self, pid: Pid) -> &Pcb {
        &self.table[pid.index()]
    }

    fn slot_mut(&mut self, pid: Pid) -> &mut Pcb {
        &mut self.table[pid.index()]
    }

    pub fn has_children(&self, pid: Pid) -> bool {
        self.get(pid).first_child.is_some()
    }

    pub fn parent(&self, pid: Pid) -> Option<Pid> {
        self.get(pid).parent
    }

    pub fn children(&self, pid: Pid) -> Children<'_> {
        Children {
            pool: self,
            cursor: self.get(pid).first_child,
        }
    }

    /// Appends `child` as the youngest child of `parent`.
    pub fn insert_child(&mut self, parent: Pid, child: Pid) {
        if parent == child {
            fatal!("{:?} cannot be its own child", child);
        }
        if let Some(current) = self.get(child).parent {
            fatal!("{:?} already has parent {:?}", child, current);
        }
        let last = self.get(parent).last_child;
        {
            let pcb = self.get_mut(child);
            pcb.parent = Some(parent);
            pcb.prev_sib = last;
            pcb.next_sib = None;
        }
        match last {
            Some(sib) => self.get_mut(sib).next_sib = Some(child),
            None => self.get_mut(parent).first_child = Some(child),
        }
        self.get_mut(parent).last_child = Some(child);
    }

    /// Detaches and returns the oldest child of `parent`. The child keeps
    /// its own subtree.
    pub fn remove_first_child(&mut self, parent: Pid) -> Option<Pid> {
        let first = self.get(parent).first_child?;
        self.detach(first)
    }

    /// Detaches `child` from its parent wherever it sits among its siblings.
    pub fn detach(&mut self, child: Pid) -> Option<Pid> {
        let parent = self.get(child).parent?;
        let (prev, next) = {
            let pcb = self.get_mut(child);
            let links = (pcb.prev_sib, pcb.next_sib);
            pcb.parent = None;
            pcb.prev_sib = None;
            pcb.next_sib = None;
            links
        };
        match prev {
            Some(p) => self.get_mut(p).next_sib = next,
            None => self.get_mut(parent).first_child = next,
        }
        match next {
            Some(n) => self.get_mut(n).prev_sib = prev,
            None => self.get_mut(parent).last_child = prev,
        }
        Some(child)
    }

    /// Every process in the subtree rooted at `root`, root first. Each
    /// process appears after its parent.
    pub fn subtree(&self, root: Pid) -> PidList {
        let mut out = PidList::new();
        let mut work = PidList::new();
        work.push(root);
        while let Some(pid) = work.pop() {
            out.push(pid);
            for child in self.children(pid) {
                work.push(child);
            }
        }
        out
    }
}
