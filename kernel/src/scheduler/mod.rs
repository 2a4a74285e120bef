//! Strict-priority ready queues.
//!
//! One FIFO per priority level plus a bitmap where bit `i` is set exactly when
//! the queue for priority `i` is non-empty. Picking the next task is a single
//! bit scan over the bitmap.

use crate::{
    constants::tasks::{MAX_TASKS, NUM_PRIORITIES},
    error::KernelError,
    queue::Queue,
    tasks::{Priority, TaskDescriptor, TaskState, Tid},
};

const EMPTY_BITMAP: u64 = 0;

type ReadyQueue = Queue<Tid, MAX_TASKS>;

pub struct Scheduler {
    bitmap: u64,
    ready_queues: [ReadyQueue; NUM_PRIORITIES],
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            bitmap: EMPTY_BITMAP,
            ready_queues: core::array::from_fn(|_| Queue::new()),
        }
    }

    /// Removes and returns the oldest task of the most urgent non-empty level.
    pub fn get(&mut self) -> Option<Tid> {
        if self.is_empty() {
            return None;
        }

        // Lowest set bit is the numerically smallest, i.e. most urgent, level.
        let level = self.bitmap.trailing_zeros() as usize;
        let queue = &mut self.ready_queues[level];
        let tid = queue.pop_front();

        if queue.is_empty() {
            self.bitmap &= !(1u64 << level);
        }

        tid
    }

    /// Queues `td` behind every ready task of its priority and marks it ready.
    pub fn put<C>(&mut self, td: &mut TaskDescriptor<C>) -> Result<(), KernelError> {
        let level = td.priority.level();
        let queue = self
            .ready_queues
            .get_mut(level)
            .ok_or(KernelError::InvalidPriority)?;
        queue
            .push_back(td.tid)
            .map_err(|_| KernelError::TaskTableFull)?;

        self.bitmap |= 1u64 << level;
        td.state = TaskState::Ready;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.bitmap == EMPTY_BITMAP
    }

    pub fn bitmap(&self) -> u64 {
        self.bitmap
    }

    pub fn len(&self) -> usize {
        self.ready_queues.iter().map(Queue::len).sum()
    }

    pub fn contains(&self, td: Tid, priority: Priority) -> bool {
        self.ready_queues
            .get(priority.level())
            .is_some_and(|queue| queue.contains(td))
    }

    /// Number of ready queue slots holding `tid`, across all levels.
    pub fn occurrences(&self, tid: Tid) -> usize {
        self.ready_queues.iter().map(|queue| queue.count(tid)).sum()
    }

    /// Bitmap and queues agree on which levels hold tasks.
    pub fn is_consistent(&self) -> bool {
        self.ready_queues
            .iter()
            .enumerate()
            .all(|(level, queue)| (self.bitmap & (1u64 << level) != 0) == !queue.is_empty())
    }
}
