use log::trace;

use crate::{
    constants::{events::MAX_EVENTS, tasks::MAX_TASKS},
    error::KernelError,
    queue::Queue,
    scheduler::Scheduler,
    tasks::{TaskDescriptor, TaskState, TaskTable, Tid},
};

use super::Event;

type AwaitQueue = Queue<Tid, MAX_TASKS>;

/// Per-event queues of tasks blocked in AwaitEvent.
pub struct EventHandler {
    await_queues: [AwaitQueue; MAX_EVENTS],
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler {
    pub fn new() -> Self {
        EventHandler {
            await_queues: core::array::from_fn(|_| Queue::new()),
        }
    }

    /// Parks `td` until `event` fires.
    pub fn add_task<C>(
        &mut self,
        event: Event,
        td: &mut TaskDescriptor<C>,
    ) -> Result<(), KernelError> {
        self.await_queues[event.index()]
            .push_back(td.tid)
            .map_err(|_| KernelError::TaskTableFull)?;
        td.state = TaskState::EventBlocked;
        Ok(())
    }

    /// Releases every task waiting on `event`, each receiving `data` as the
    /// AwaitEvent result. Returns how many tasks were woken.
    pub fn handle_event<C>(
        &mut self,
        event: Event,
        data: i32,
        tasks: &mut TaskTable<C>,
        scheduler: &mut Scheduler,
    ) -> Result<usize, KernelError> {
        let mut woken = 0;
        while let Some(tid) = self.await_queues[event.index()].pop_front() {
            let td = tasks.expect_mut(tid)?;
            td.set_return_value(data as isize);
            scheduler.put(td)?;
            woken += 1;
        }
        if woken > 0 {
            trace!("{:?} woke {} task(s) with {}", event, woken, data);
        }
        Ok(woken)
    }

    /// True when no task waits on any event.
    pub fn is_empty(&self) -> bool {
        self.await_queues.iter().all(Queue::is_empty)
    }

    pub fn waiting(&self, event: Event) -> usize {
        self.await_queues[event.index()].len()
    }

    pub fn occurrences(&self, tid: Tid) -> usize {
        self.await_queues.iter().map(|queue| queue.count(tid)).sum()
    }

    /// Event `tid` is parked on, if any.
    pub fn awaited_by(&self, tid: Tid) -> Option<Event> {
        Event::ALL
            .iter()
            .copied()
            .find(|event| self.await_queues[event.index()].contains(tid))
    }
}
