//! Synchronous copy-based message passing.
//!
//! Every exchange is one Send, one Receive and one Reply. Whichever of Send and
//! Receive comes second performs the copy; the sender then waits for the reply.

mod transfer;

pub use transfer::{receive, reply, send};

/// Address inside a task's memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct UserPtr(pub usize);

/// A task-supplied buffer: where it starts and how many bytes it holds or
/// expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserBuf {
    pub ptr: UserPtr,
    pub len: usize,
}

impl UserBuf {
    pub fn new(ptr: usize, len: usize) -> Self {
        UserBuf {
            ptr: UserPtr(ptr),
            len,
        }
    }
}
