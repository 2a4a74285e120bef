//! Kernel error taxonomy.
//!
//! [`KernelError`] is returned to the offending task as a negative syscall
//! result; the task stays runnable. [`FatalError`] stops the kernel.

use core::fmt;

use arrayvec::ArrayString;

use crate::{
    constants::syscalls::PANIC_MESSAGE_CAPACITY, events::Uart, metrics::MetricsReport, tasks::Tid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    InvalidTid,
    SizeMismatch,
    InvalidPriority,
    TaskTableFull,
    InvalidEvent,
    NotAwaitingReply,
}

impl KernelError {
    /// Value the failing syscall returns to its caller.
    pub fn code(self) -> isize {
        match self {
            KernelError::InvalidTid => -1,
            KernelError::SizeMismatch => -2,
            KernelError::InvalidPriority => -3,
            KernelError::TaskTableFull => -4,
            KernelError::InvalidEvent => -5,
            KernelError::NotAwaitingReply => -6,
        }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::InvalidTid => write!(f, "Invalid target task id"),
            KernelError::SizeMismatch => write!(f, "Message and buffer sizes differ"),
            KernelError::InvalidPriority => write!(f, "Priority out of range"),
            KernelError::TaskTableFull => write!(f, "No free task descriptors"),
            KernelError::InvalidEvent => write!(f, "Unknown event kind"),
            KernelError::NotAwaitingReply => write!(f, "Target is not waiting for a reply"),
        }
    }
}

pub type PanicMessage = ArrayString<PANIC_MESSAGE_CAPACITY>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    UnknownSyscall(u32),
    UnexpectedInterrupt(u32),
    UnexpectedUartStatus { port: Uart, status: u8 },
    TaskPanic(PanicMessage),
    /// A kernel data structure no longer matches the task states.
    Corrupted(&'static str),
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::UnknownSyscall(code) => write!(f, "Unknown syscall code {}", code),
            FatalError::UnexpectedInterrupt(vector) => {
                write!(f, "Unexpected interrupt vector {}", vector)
            }
            FatalError::UnexpectedUartStatus { port, status } => {
                write!(f, "Unexpected {:?} interrupt status {:#04x}", port, status)
            }
            FatalError::TaskPanic(message) => write!(f, "Task panic: {}", message),
            FatalError::Corrupted(what) => write!(f, "Kernel state corrupted: {}", what),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The last ready task exited.
    AllExited,
    /// A task asked the kernel to stop.
    Quit,
    /// The ready set ran dry while tasks were still blocked.
    Idle,
}

/// Orderly end of [`crate::Kernel::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shutdown {
    pub reason: ShutdownReason,
    pub report: MetricsReport,
}

/// Irrecoverable end of [`crate::Kernel::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelPanic {
    pub error: FatalError,
    /// Task that was active when the error surfaced.
    pub tid: Option<Tid>,
    pub report: MetricsReport,
}

impl fmt::Display for KernelPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tid {
            Some(tid) => write!(f, "kernel panic in task {}: {}", tid, self.error),
            None => write!(f, "kernel panic: {}", self.error),
        }
    }
}
