use log::{debug, info, trace};

use crate::{
    constants::syscalls::{NO_PARENT, PANIC_MESSAGE_CAPACITY},
    error::{FatalError, KernelError, PanicMessage, ShutdownReason},
    events::Event,
    interrupts, ipc,
    ipc::UserBuf,
    kernel::{corrupted, Kernel},
    platform::Platform,
    tasks::{Priority, TaskState, Tid},
};

use super::{Completion, Syscall, SyscallArgs};

impl<P: Platform> Kernel<P> {
    /// Carries out the syscall `tid` trapped with. Returns the halt reason if
    /// the call stops the system.
    pub(crate) fn handle_syscall(
        &mut self,
        tid: Tid,
        code: u32,
        args: SyscallArgs,
    ) -> Result<Option<ShutdownReason>, FatalError> {
        let call = Syscall::decode(code, args)?;
        trace!("task {}: {:?}", tid, call);

        let result = match call {
            Syscall::Exit => return self.sys_exit(tid),
            Syscall::Quit => {
                info!("task {} requested shutdown", tid);
                return Ok(Some(ShutdownReason::Quit));
            }
            Syscall::Panic { message } => {
                return Err(FatalError::TaskPanic(self.read_panic_message(message)))
            }
            Syscall::Pass => Ok(Completion::Ready(0)),
            Syscall::Create { priority, entry } => self.sys_create(tid, priority, entry),
            Syscall::MyTid => Ok(Completion::Ready(tid.0 as isize)),
            Syscall::MyParentTid => self.sys_parent_tid(tid),
            Syscall::Send { target, msg, reply } => ipc::send(
                &mut self.ctx.tasks,
                &mut self.ctx.scheduler,
                &mut self.platform,
                tid,
                target,
                msg,
                reply,
            ),
            Syscall::Receive { sender_out, buf } => {
                ipc::receive(&mut self.ctx.tasks, &mut self.platform, tid, sender_out, buf)
            }
            Syscall::Reply { target, buf } => ipc::reply(
                &mut self.ctx.tasks,
                &mut self.ctx.scheduler,
                &mut self.platform,
                tid,
                target,
                buf,
            ),
            Syscall::AwaitEvent { event } => self.sys_await_event(tid, event),
        };

        self.complete(tid, result)?;
        Ok(None)
    }

    /// Re-readies the caller with its result unless the call parked it.
    fn complete(
        &mut self,
        tid: Tid,
        result: Result<Completion, KernelError>,
    ) -> Result<(), FatalError> {
        let value = match result {
            Ok(Completion::Blocked) => return Ok(()),
            Ok(Completion::Ready(value)) => value,
            Err(err) => {
                debug!("task {}: {}", tid, err);
                err.code()
            }
        };

        let td = self.ctx.tasks.expect_mut(tid).map_err(corrupted)?;
        td.set_return_value(value);
        self.ctx.scheduler.put(td).map_err(corrupted)
    }

    fn sys_create(
        &mut self,
        parent: Tid,
        priority: isize,
        entry: usize,
    ) -> Result<Completion, KernelError> {
        let priority = Priority::new(priority)?;
        let platform = &mut self.platform;
        let tid = self.ctx.tasks.create(priority, Some(parent), |tid| {
            platform.initial_context(tid, entry)
        })?;
        // The child is queued ahead of its creator.
        self.ctx.scheduler.put(self.ctx.tasks.expect_mut(tid)?)?;

        debug!(
            "task {} created task {} at priority {}",
            parent,
            tid,
            priority.level()
        );
        Ok(Completion::Ready(tid.0 as isize))
    }

    fn sys_parent_tid(&self, tid: Tid) -> Result<Completion, KernelError> {
        let td = self.ctx.tasks.get(tid).ok_or(KernelError::InvalidTid)?;
        Ok(Completion::Ready(
            td.parent.map_or(NO_PARENT, |parent| parent.0 as isize),
        ))
    }

    fn sys_await_event(&mut self, tid: Tid, raw: usize) -> Result<Completion, KernelError> {
        let event = Event::try_from(raw)?;
        interrupts::arm(&mut self.platform, event);

        let td = self.ctx.tasks.expect_mut(tid)?;
        self.ctx.events.add_task(event, td)?;
        trace!("task {} awaits {:?}", tid, event);
        Ok(Completion::Blocked)
    }

    fn sys_exit(&mut self, tid: Tid) -> Result<Option<ShutdownReason>, FatalError> {
        let td = self.ctx.tasks.expect_mut(tid).map_err(corrupted)?;
        td.state = TaskState::Exited;
        debug!("task {} exited", tid);

        if self.ctx.scheduler.is_empty() {
            Ok(Some(ShutdownReason::AllExited))
        } else {
            Ok(None)
        }
    }

    /// Copies a task's panic message out of its memory. Stops at the first
    /// NUL; anything past the capacity or outside ASCII is dropped or replaced.
    fn read_panic_message(&self, message: UserBuf) -> PanicMessage {
        let mut raw = [0u8; PANIC_MESSAGE_CAPACITY];
        let len = message.len.min(PANIC_MESSAGE_CAPACITY);
        self.platform.read(message.ptr, &mut raw[..len]);

        let mut text = PanicMessage::new();
        for &byte in raw[..len].iter().take_while(|&&byte| byte != 0) {
            let c = if byte.is_ascii() {
                byte as char
            } else {
                char::REPLACEMENT_CHARACTER
            };
            if text.try_push(c).is_err() {
                break;
            }
        }
        text
    }
}
