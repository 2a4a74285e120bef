use core::fmt;

use crate::{
    constants::tasks::{FIRST_TASK_PRIORITY, IDLE_TASK_PRIORITY, MAX_TASKS, NUM_PRIORITIES},
    error::KernelError,
    ipc::{UserBuf, UserPtr},
    queue::Queue,
};

/// Task identifier. Dense, assigned in creation order, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tid(pub u8);

impl Tid {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduling priority. 0 is the most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(u8);

impl Priority {
    pub const HIGHEST: Priority = Priority(0);
    pub const LOWEST: Priority = Priority((NUM_PRIORITIES - 1) as u8);
    pub const FIRST_TASK: Priority = Priority(FIRST_TASK_PRIORITY);
    pub const IDLE_TASK: Priority = Priority(IDLE_TASK_PRIORITY);

    /// Validates a raw priority coming from a syscall argument.
    pub fn new(raw: isize) -> Result<Self, KernelError> {
        if raw < 0 || raw >= NUM_PRIORITIES as isize {
            return Err(KernelError::InvalidPriority);
        }
        Ok(Priority(raw as u8))
    }

    pub fn level(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// In its priority's ready queue.
    Ready,
    /// Currently owns the CPU. At most one task at a time.
    Active,
    /// Called Send; queued on the target's send-wait queue until the target
    /// calls Receive.
    SendBlocked,
    /// Called Receive with nobody waiting to send; parked until a Send arrives.
    ReceiveBlocked,
    /// Its message has been received; waiting for the Reply.
    ReplyBlocked,
    /// Parked in an event wait queue until the interrupt fires.
    EventBlocked,
    Exited,
}

/// Buffers of an in-flight IPC exchange. Only meaningful while the task is
/// blocked in Send, Receive or waiting for a Reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageParams {
    /// Where Receive stores the id of the sender.
    pub sender_out: Option<UserPtr>,
    /// Outgoing message (sender) or destination buffer (receiver).
    pub msg: UserBuf,
    /// Where the reply lands.
    pub reply: UserBuf,
}

pub type SendQueue = Queue<Tid, MAX_TASKS>;

#[derive(Debug)]
pub struct TaskDescriptor<C> {
    pub tid: Tid,
    pub priority: Priority,
    pub parent: Option<Tid>,
    pub state: TaskState,
    /// Saved registers, owned by the context switch primitive.
    pub context: C,
    /// Syscall result to install the next time the task is activated.
    pub pending_return: Option<isize>,
    /// Tasks blocked trying to send to this one, in arrival order.
    pub send_queue: SendQueue,
    pub message: MessageParams,
}

impl<C> TaskDescriptor<C> {
    pub fn new(tid: Tid, priority: Priority, parent: Option<Tid>, context: C) -> Self {
        TaskDescriptor {
            tid,
            priority,
            parent,
            state: TaskState::Ready,
            context,
            pending_return: Some(0),
            send_queue: Queue::new(),
            message: MessageParams::default(),
        }
    }

    pub fn set_return_value(&mut self, value: isize) {
        self.pending_return = Some(value);
    }

    pub fn is_live(&self) -> bool {
        self.state != TaskState::Exited
    }
}
