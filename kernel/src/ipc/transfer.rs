use log::trace;

use crate::{
    error::KernelError,
    platform::UserMemory,
    scheduler::Scheduler,
    syscalls::Completion,
    tasks::{MessageParams, TaskState, TaskTable, Tid},
};

use super::{UserBuf, UserPtr};

/// Sends `msg` from `active` to the task `target` and waits for a `reply`.
///
/// A target already parked in Receive gets the message immediately and is
/// readied with the sender's id; the sender then waits for the reply.
/// Otherwise the sender joins the back of the target's send-wait queue.
/// On error nothing is copied and the sender stays runnable.
pub fn send<C>(
    tasks: &mut TaskTable<C>,
    scheduler: &mut Scheduler,
    memory: &mut impl UserMemory,
    active: Tid,
    target: usize,
    msg: UserBuf,
    reply: UserBuf,
) -> Result<Completion, KernelError> {
    let target = tasks.live(target)?;
    if target == active {
        return Err(KernelError::InvalidTid);
    }

    let receiver = tasks.expect_mut(target)?;
    let sender_state = if receiver.state == TaskState::ReceiveBlocked {
        let dest = receiver.message;
        if dest.msg.len != msg.len {
            return Err(KernelError::SizeMismatch);
        }

        memory.copy(msg.ptr, dest.msg.ptr, msg.len);
        if let Some(out) = dest.sender_out {
            memory.write(out, &[active.0]);
        }
        receiver.message = MessageParams::default();
        receiver.set_return_value(active.0 as isize);
        scheduler.put(receiver)?;

        trace!("task {} -> task {}: {} bytes delivered", active, target, msg.len);
        TaskState::ReplyBlocked
    } else {
        receiver
            .send_queue
            .push_back(active)
            .map_err(|_| KernelError::TaskTableFull)?;

        trace!("task {} -> task {}: queued", active, target);
        TaskState::SendBlocked
    };

    let sender = tasks.expect_mut(active)?;
    sender.message = MessageParams {
        sender_out: None,
        msg,
        reply,
    };
    sender.state = sender_state;
    Ok(Completion::Blocked)
}

/// Takes the oldest queued message for `active`, or parks it until one is sent.
///
/// Completes with the sender's id. A length mismatch against the queued
/// sender leaves that sender at the head of the queue so the receiver can retry.
pub fn receive<C>(
    tasks: &mut TaskTable<C>,
    memory: &mut impl UserMemory,
    active: Tid,
    sender_out: UserPtr,
    buf: UserBuf,
) -> Result<Completion, KernelError> {
    let receiver = tasks.expect_mut(active)?;
    let Some(sender_tid) = receiver.send_queue.pop_front() else {
        receiver.message = MessageParams {
            sender_out: Some(sender_out),
            msg: buf,
            reply: UserBuf::default(),
        };
        receiver.state = TaskState::ReceiveBlocked;
        return Ok(Completion::Blocked);
    };

    let msg = tasks.expect_mut(sender_tid)?.message.msg;
    if msg.len != buf.len {
        tasks
            .expect_mut(active)?
            .send_queue
            .push_front(sender_tid)
            .map_err(|_| KernelError::TaskTableFull)?;
        return Err(KernelError::SizeMismatch);
    }

    memory.copy(msg.ptr, buf.ptr, buf.len);
    memory.write(sender_out, &[sender_tid.0]);
    tasks.expect_mut(sender_tid)?.state = TaskState::ReplyBlocked;

    trace!("task {} <- task {}: {} bytes received", active, sender_tid, buf.len);
    Ok(Completion::Ready(sender_tid.0 as isize))
}

/// Copies `buf` into the reply buffer of `target` and readies it.
/// The replier never blocks.
pub fn reply<C>(
    tasks: &mut TaskTable<C>,
    scheduler: &mut Scheduler,
    memory: &mut impl UserMemory,
    active: Tid,
    target: usize,
    buf: UserBuf,
) -> Result<Completion, KernelError> {
    let target = tasks.live(target)?;
    let td = tasks.expect_mut(target)?;
    if td.state != TaskState::ReplyBlocked {
        return Err(KernelError::NotAwaitingReply);
    }
    if td.message.reply.len != buf.len {
        return Err(KernelError::SizeMismatch);
    }

    memory.copy(buf.ptr, td.message.reply.ptr, buf.len);
    td.message = MessageParams::default();
    td.set_return_value(0);
    scheduler.put(td)?;

    trace!("task {} replied to task {}", active, target);
    Ok(Completion::Ready(0))
}
