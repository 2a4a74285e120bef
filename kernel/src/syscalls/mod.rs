//! The syscall boundary: numbering, argument layout and decoding.
//!
//! A task traps with a code and up to [`SYSCALL_ARG_COUNT`] word arguments.
//! [`Syscall::decode`] turns that into a typed request; [`Syscall::encode`] is
//! the inverse, used by user-side stubs.

use crate::{
    constants::syscalls::*,
    error::FatalError,
    ipc::{UserBuf, UserPtr},
};

mod syscall_handlers;

pub type SyscallArgs = [usize; SYSCALL_ARG_COUNT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Exit,
    Pass,
    Create { priority: isize, entry: usize },
    MyTid,
    MyParentTid,
    Send { target: usize, msg: UserBuf, reply: UserBuf },
    Receive { sender_out: UserPtr, buf: UserBuf },
    Reply { target: usize, buf: UserBuf },
    AwaitEvent { event: usize },
    Panic { message: UserBuf },
    Quit,
}

impl Syscall {
    pub fn decode(code: u32, args: SyscallArgs) -> Result<Syscall, FatalError> {
        let [a0, a1, a2, a3, a4] = args;
        let call = match code {
            SYSCALL_EXIT => Syscall::Exit,
            SYSCALL_PASS => Syscall::Pass,
            SYSCALL_CREATE => Syscall::Create {
                priority: a0 as isize,
                entry: a1,
            },
            SYSCALL_MYTID => Syscall::MyTid,
            SYSCALL_PARENTTID => Syscall::MyParentTid,
            SYSCALL_SEND => Syscall::Send {
                target: a0,
                msg: UserBuf::new(a1, a2),
                reply: UserBuf::new(a3, a4),
            },
            SYSCALL_RECEIVE => Syscall::Receive {
                sender_out: UserPtr(a0),
                buf: UserBuf::new(a1, a2),
            },
            SYSCALL_REPLY => Syscall::Reply {
                target: a0,
                buf: UserBuf::new(a1, a2),
            },
            SYSCALL_AWAITEVENT => Syscall::AwaitEvent { event: a0 },
            SYSCALL_PANIC => Syscall::Panic {
                message: UserBuf::new(a0, a1),
            },
            SYSCALL_QUIT => Syscall::Quit,
            _ => return Err(FatalError::UnknownSyscall(code)),
        };
        Ok(call)
    }

    pub fn encode(&self) -> (u32, SyscallArgs) {
        match *self {
            Syscall::Exit => (SYSCALL_EXIT, [0; SYSCALL_ARG_COUNT]),
            Syscall::Pass => (SYSCALL_PASS, [0; SYSCALL_ARG_COUNT]),
            Syscall::Create { priority, entry } => {
                (SYSCALL_CREATE, [priority as usize, entry, 0, 0, 0])
            }
            Syscall::MyTid => (SYSCALL_MYTID, [0; SYSCALL_ARG_COUNT]),
            Syscall::MyParentTid => (SYSCALL_PARENTTID, [0; SYSCALL_ARG_COUNT]),
            Syscall::Send { target, msg, reply } => (
                SYSCALL_SEND,
                [target, msg.ptr.0, msg.len, reply.ptr.0, reply.len],
            ),
            Syscall::Receive { sender_out, buf } => {
                (SYSCALL_RECEIVE, [sender_out.0, buf.ptr.0, buf.len, 0, 0])
            }
            Syscall::Reply { target, buf } => (SYSCALL_REPLY, [target, buf.ptr.0, buf.len, 0, 0]),
            Syscall::AwaitEvent { event } => (SYSCALL_AWAITEVENT, [event, 0, 0, 0, 0]),
            Syscall::Panic { message } => (SYSCALL_PANIC, [message.ptr.0, message.len, 0, 0, 0]),
            Syscall::Quit => (SYSCALL_QUIT, [0; SYSCALL_ARG_COUNT]),
        }
    }
}

/// Outcome of a syscall that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The caller is runnable again and resumes with this result.
    Ready(isize),
    /// The caller is parked; whoever unblocks it supplies the result.
    Blocked,
}
