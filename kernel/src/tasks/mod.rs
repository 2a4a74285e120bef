//! Task descriptors and the fixed task table.
//!
//! The table hands out tids in creation order and never frees a slot: an
//! exited task keeps its descriptor (state `Exited`) until the machine halts.

use arrayvec::ArrayVec;

use crate::{constants::tasks::MAX_TASKS, error::KernelError};

mod task;

pub use task::{MessageParams, Priority, SendQueue, TaskDescriptor, TaskState, Tid};

pub struct TaskTable<C> {
    tasks: ArrayVec<TaskDescriptor<C>, MAX_TASKS>,
}

impl<C> Default for TaskTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> TaskTable<C> {
    pub fn new() -> Self {
        TaskTable {
            tasks: ArrayVec::new(),
        }
    }

    /// Allocates the next descriptor. `make_context` receives the new tid so
    /// the platform can lay out the task's initial registers and stack.
    pub fn create(
        &mut self,
        priority: Priority,
        parent: Option<Tid>,
        make_context: impl FnOnce(Tid) -> C,
    ) -> Result<Tid, KernelError> {
        if self.tasks.is_full() {
            return Err(KernelError::TaskTableFull);
        }
        let tid = Tid(self.tasks.len() as u8);
        let td = TaskDescriptor::new(tid, priority, parent, make_context(tid));
        self.tasks
            .try_push(td)
            .map_err(|_| KernelError::TaskTableFull)?;
        Ok(tid)
    }

    /// Number of descriptors ever created.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, tid: Tid) -> Option<&TaskDescriptor<C>> {
        self.tasks.get(tid.index())
    }

    pub fn get_mut(&mut self, tid: Tid) -> Option<&mut TaskDescriptor<C>> {
        self.tasks.get_mut(tid.index())
    }

    /// Resolves a raw tid from a syscall argument to a task that has not exited.
    pub fn live(&self, raw: usize) -> Result<Tid, KernelError> {
        match self.tasks.get(raw) {
            Some(td) if td.is_live() => Ok(td.tid),
            _ => Err(KernelError::InvalidTid),
        }
    }

    /// Descriptor lookup for tids the kernel itself produced.
    pub fn expect_mut(&mut self, tid: Tid) -> Result<&mut TaskDescriptor<C>, KernelError> {
        self.get_mut(tid).ok_or(KernelError::InvalidTid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskDescriptor<C>> {
        self.tasks.iter()
    }

    pub fn count_in(&self, state: TaskState) -> usize {
        self.tasks.iter().filter(|td| td.state == state).count()
    }
}
