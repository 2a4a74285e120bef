//! Boot, the dispatch loop and halting.
//!
//! [`Kernel::run`] is a trampoline: pick the most urgent ready task, hand it
//! the CPU, and service whatever brought control back (a syscall or an
//! interrupt). It returns once the system halts.

use log::{debug, error, info};

use crate::{
    constants::tasks::{IDLE_STATUS_EXIT_OFFSET, IDLE_STATUS_TIME_OFFSET},
    error::{FatalError, KernelError, KernelPanic, Shutdown, ShutdownReason},
    events::EventHandler,
    interrupts,
    ipc::UserPtr,
    metrics::Metrics,
    platform::{Platform, Trap},
    scheduler::Scheduler,
    tasks::{Priority, TaskState, TaskTable, Tid},
};

/// A task started by the kernel itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    pub priority: Priority,
    pub entry: usize,
}

impl TaskSpec {
    pub fn new(entry: usize) -> Self {
        TaskSpec {
            priority: Priority::FIRST_TASK,
            entry,
        }
    }
}

/// The idle task and where it finds its status block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleSpec {
    pub priority: Priority,
    pub entry: usize,
    pub status: UserPtr,
}

impl IdleSpec {
    pub fn new(entry: usize, status: usize) -> Self {
        IdleSpec {
            priority: Priority::IDLE_TASK,
            entry,
            status: UserPtr(status),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Gets tid 0.
    pub first_task: TaskSpec,
    /// Gets tid 1 when present.
    pub idle: Option<IdleSpec>,
}

/// All kernel bookkeeping, owned in one place and threaded through every
/// handler.
pub struct KernelContext<C> {
    pub tasks: TaskTable<C>,
    pub scheduler: Scheduler,
    pub events: EventHandler,
    pub metrics: Metrics,
}

impl<C> KernelContext<C> {
    pub fn new(now: u32) -> Self {
        KernelContext {
            tasks: TaskTable::new(),
            scheduler: Scheduler::new(),
            events: EventHandler::new(),
            metrics: Metrics::new(now),
        }
    }

    /// Cross-checks task states against queue membership.
    ///
    /// Every `Ready` task sits in its own ready queue, every `SendBlocked`
    /// task in exactly one send queue, every `EventBlocked` task in exactly
    /// one event queue, and no other task in any queue.
    pub fn audit(&self) -> Result<(), FatalError> {
        if !self.scheduler.is_consistent() {
            return Err(FatalError::Corrupted("ready bitmap out of sync"));
        }
        if self.tasks.count_in(TaskState::Active) > 1 {
            return Err(FatalError::Corrupted("more than one active task"));
        }

        for td in self.tasks.iter() {
            let ready = self.scheduler.occurrences(td.tid);
            let waiting = self.events.occurrences(td.tid);
            let sending: usize = self
                .tasks
                .iter()
                .map(|receiver| receiver.send_queue.count(td.tid))
                .sum();

            let ok = match td.state {
                TaskState::Ready => {
                    ready == 1
                        && self.scheduler.contains(td.tid, td.priority)
                        && waiting + sending == 0
                }
                TaskState::SendBlocked => sending == 1 && ready + waiting == 0,
                TaskState::EventBlocked => waiting == 1 && ready + sending == 0,
                TaskState::Active
                | TaskState::ReceiveBlocked
                | TaskState::ReplyBlocked
                | TaskState::Exited => ready + waiting + sending == 0,
            };
            if !ok {
                return Err(FatalError::Corrupted("task state disagrees with its queues"));
            }
        }
        Ok(())
    }
}

pub struct Kernel<P: Platform> {
    pub(crate) platform: P,
    pub(crate) ctx: KernelContext<P::Context>,
    idle: Option<(Tid, UserPtr)>,
}

impl<P: Platform> Kernel<P> {
    /// Creates the boot tasks and routes interrupts. Nothing runs until
    /// [`Kernel::run`].
    pub fn new(mut platform: P, config: KernelConfig) -> Result<Self, KernelError> {
        let mut ctx = KernelContext::new(platform.now());

        let first = config.first_task;
        let first_tid = ctx.tasks.create(first.priority, None, |tid| {
            platform.initial_context(tid, first.entry)
        })?;
        ctx.scheduler.put(ctx.tasks.expect_mut(first_tid)?)?;

        let mut idle = None;
        if let Some(spec) = config.idle {
            let tid = ctx.tasks.create(spec.priority, None, |tid| {
                platform.initial_context(tid, spec.entry)
            })?;
            ctx.scheduler.put(ctx.tasks.expect_mut(tid)?)?;
            idle = Some((tid, spec.status));
        }

        platform.enable_sources();
        info!(
            "kernel booted: first task {} at priority {}, idle task {:?}",
            first_tid,
            first.priority.level(),
            idle.map(|(tid, _)| tid.0)
        );

        Ok(Kernel {
            platform,
            ctx,
            idle,
        })
    }

    /// Runs tasks until the system halts.
    pub fn run(&mut self) -> Result<Shutdown, KernelPanic> {
        let outcome = self.dispatch_loop();

        self.platform.disable_all();
        let report = self.ctx.metrics.report(self.platform.now());
        info!("non-idle time: {}/{}", report.non_idle_time, report.uptime);

        match outcome {
            Ok(reason) => {
                info!("kernel halted: {:?}", reason);
                Ok(Shutdown { reason, report })
            }
            Err((error, tid)) => {
                let panic = KernelPanic { error, tid, report };
                error!("{}", panic);
                Err(panic)
            }
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn context(&self) -> &KernelContext<P::Context> {
        &self.ctx
    }

    fn dispatch_loop(&mut self) -> Result<ShutdownReason, (FatalError, Option<Tid>)> {
        loop {
            let Some(tid) = self.ctx.scheduler.get() else {
                debug!("no ready task left");
                return Ok(ShutdownReason::Idle);
            };

            let halt = self
                .activate(tid)
                .and_then(|trap| match trap {
                    Trap::Syscall { code, args } => self.handle_syscall(tid, code, args),
                    Trap::Interrupt => self.handle_interrupt(tid),
                })
                .map_err(|error| (error, Some(tid)))?;

            if let Some(reason) = halt {
                return Ok(reason);
            }

            if cfg!(debug_assertions) {
                self.ctx.audit().map_err(|error| (error, None))?;
            }
        }
    }

    fn activate(&mut self, tid: Tid) -> Result<Trap, FatalError> {
        let idle_status = self.idle.and_then(|(idle, status)| (idle == tid).then_some(status));
        if let Some(status) = idle_status {
            self.publish_idle_status(status);
        }

        let td = self.ctx.tasks.expect_mut(tid).map_err(corrupted)?;
        td.state = TaskState::Active;
        let return_value = td.pending_return.take();
        let trap = self.platform.activate(tid, &mut td.context, return_value);

        if idle_status.is_some() {
            self.ctx.metrics.idle_stopped(self.platform.now());
        }
        Ok(trap)
    }

    /// Tells the idle task how busy the system was and whether anything can
    /// still wake up.
    fn publish_idle_status(&mut self, status: UserPtr) {
        let non_idle_time = self.ctx.metrics.idle_starting(self.platform.now());

        let mut block = [0u8; IDLE_STATUS_TIME_OFFSET + 4];
        block[IDLE_STATUS_EXIT_OFFSET] = self.ctx.events.is_empty() as u8;
        block[IDLE_STATUS_TIME_OFFSET..].copy_from_slice(&non_idle_time.to_le_bytes());
        self.platform.write(status, &block);
    }

    fn handle_interrupt(&mut self, tid: Tid) -> Result<Option<ShutdownReason>, FatalError> {
        let deliveries = interrupts::decode(&mut self.platform)?;
        for delivery in deliveries {
            self.ctx
                .events
                .handle_event(
                    delivery.event,
                    delivery.data,
                    &mut self.ctx.tasks,
                    &mut self.ctx.scheduler,
                )
                .map_err(corrupted)?;
        }

        // Preemption never changes what the task was doing; it just runs again later.
        let td = self.ctx.tasks.expect_mut(tid).map_err(corrupted)?;
        self.ctx.scheduler.put(td).map_err(corrupted)?;
        Ok(None)
    }
}

/// A lookup or queue operation on a tid the kernel produced itself failed.
pub(crate) fn corrupted(_: KernelError) -> FatalError {
    FatalError::Corrupted("kernel tables rejected a kernel-issued tid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::{syscalls::NO_PARENT, uart::RIS_MASK},
        events::{Event, Uart, UartCondition},
        ipc::UserBuf,
        platform::sim::{IrqState, SimMachine, Step},
        syscalls::Syscall,
    };

    const FIRST: usize = 0x10;
    const IDLE: usize = 0x20;
    const P1: usize = 0x30;
    const P2: usize = 0x40;
    const STATUS: usize = 0x800;

    fn call(syscall: Syscall) -> Step {
        Step::Call(syscall)
    }

    fn create(priority: isize, entry: usize) -> Step {
        call(Syscall::Create { priority, entry })
    }

    fn boot(machine: SimMachine) -> Kernel<SimMachine> {
        let config = KernelConfig {
            first_task: TaskSpec::new(FIRST),
            idle: None,
        };
        Kernel::new(machine, config).unwrap()
    }

    fn state(kernel: &Kernel<SimMachine>, tid: u8) -> TaskState {
        kernel.context().tasks.get(Tid(tid)).unwrap().state
    }

    #[test]
    fn test_send_receive_reply_scenario() {
        let mut machine = SimMachine::new();
        machine.memory.place(0x100, b"hi");
        machine.memory.place(0x300, b"ok");
        machine.load(FIRST, vec![create(5, P1), create(3, P2)]);
        machine.load(
            P1,
            vec![call(Syscall::Send {
                target: 2,
                msg: UserBuf::new(0x100, 2),
                reply: UserBuf::new(0x400, 2),
            })],
        );
        machine.load(
            P2,
            vec![
                call(Syscall::Receive {
                    sender_out: UserPtr(0x250),
                    buf: UserBuf::new(0x200, 2),
                }),
                call(Syscall::Reply {
                    target: 1,
                    buf: UserBuf::new(0x300, 2),
                }),
            ],
        );

        let mut kernel = boot(machine);
        let shutdown = kernel.run().unwrap();
        let sim = kernel.platform();

        assert_eq!(shutdown.reason, ShutdownReason::AllExited);
        // P2 outranks P1 and runs first; tid 1 is P1, tid 2 is P2.
        assert_eq!(sim.returns_of(Tid(0)), &[1, 2]);
        assert_eq!(sim.returns_of(Tid(2)), &[1, 0]);
        assert_eq!(sim.returns_of(Tid(1)), &[0]);
        assert_eq!(sim.memory.bytes(0x200, 2), b"hi");
        assert_eq!(sim.memory.bytes(0x250, 1), &[1]);
        assert_eq!(sim.memory.bytes(0x400, 2), b"ok");
        assert_eq!(sim.disabled, 1);
    }

    #[test]
    fn test_higher_priority_runs_first_and_creator_follows_child() {
        let mut machine = SimMachine::new();
        machine.load(FIRST, vec![create(5, P1), create(1, P2), call(Syscall::Pass)]);
        machine.load(P1, vec![call(Syscall::MyTid)]);
        machine.load(P2, vec![call(Syscall::MyParentTid)]);

        let mut kernel = boot(machine);
        kernel.run().unwrap();
        let sim = kernel.platform();

        // First task (prio 1) creates P1 (prio 5), keeps running, creates P2
        // (prio 1) which is queued ahead of it.
        assert_eq!(
            sim.trace,
            vec![Tid(0), Tid(0), Tid(2), Tid(0), Tid(2), Tid(0), Tid(1), Tid(1)]
        );
        assert_eq!(sim.returns_of(Tid(2)), &[0]);
        assert_eq!(sim.returns_of(Tid(1)), &[1]);
    }

    #[test]
    fn test_parent_of_root_task() {
        let mut machine = SimMachine::new();
        machine.load(FIRST, vec![call(Syscall::MyParentTid)]);

        let mut kernel = boot(machine);
        kernel.run().unwrap();
        assert_eq!(kernel.platform().returns_of(Tid(0)), &[NO_PARENT]);
    }

    #[test]
    fn test_errors_are_returned_and_caller_keeps_running() {
        let mut machine = SimMachine::new();
        machine.load(
            FIRST,
            vec![
                create(64, P1),
                create(-1, P1),
                call(Syscall::Send {
                    target: 9,
                    msg: UserBuf::default(),
                    reply: UserBuf::default(),
                }),
                call(Syscall::Reply {
                    target: 0,
                    buf: UserBuf::default(),
                }),
                call(Syscall::AwaitEvent { event: 11 }),
            ],
        );

        let mut kernel = boot(machine);
        kernel.run().unwrap();
        assert_eq!(
            kernel.platform().returns_of(Tid(0)),
            &[
                KernelError::InvalidPriority.code(),
                KernelError::InvalidPriority.code(),
                KernelError::InvalidTid.code(),
                KernelError::NotAwaitingReply.code(),
                KernelError::InvalidEvent.code(),
            ]
        );
    }

    #[test]
    fn test_task_table_exhaustion() {
        let mut machine = SimMachine::new();
        machine.load(FIRST, vec![create(0, P1); 64]);
        machine.load(P1, vec![call(Syscall::AwaitEvent { event: 0 })]);

        let mut kernel = boot(machine);
        kernel.run().unwrap();
        let returns = kernel.platform().returns_of(Tid(0));

        assert_eq!(returns.len(), 64);
        assert_eq!(returns[62], 63);
        assert_eq!(returns[63], KernelError::TaskTableFull.code());
        assert_eq!(kernel.context().tasks.len(), 64);
    }

    #[test]
    fn test_interrupt_wakes_all_waiters_and_requeues_preempted_task() {
        let mut machine = SimMachine::new();
        machine.load(
            FIRST,
            vec![
                create(2, P1),
                create(2, P1),
                create(4, P2),
                call(Syscall::AwaitEvent { event: 0 }),
            ],
        );
        machine.load(
            P1,
            vec![call(Syscall::AwaitEvent {
                event: Event::Uart2Rx as usize,
            })],
        );
        machine.load(
            P2,
            vec![
                Step::Preempt(IrqState::uart(Uart::Uart2, RIS_MASK).with_data(b'x' as u32)),
                Step::Preempt(IrqState::timer()),
                call(Syscall::Pass),
            ],
        );

        let mut kernel = boot(machine);
        let shutdown = kernel.run().unwrap();
        let sim = kernel.platform();

        assert_eq!(shutdown.reason, ShutdownReason::AllExited);
        assert_eq!(sim.returns_of(Tid(1)), &[b'x' as isize]);
        assert_eq!(sim.returns_of(Tid(2)), &[b'x' as isize]);
        assert_eq!(sim.returns_of(Tid(0)), &[1, 2, 3, 0]);
        assert_eq!(sim.returns_of(Tid(3)), &[0]);
        assert_eq!(sim.acknowledged, 2);
        assert_eq!(sim.timer_cleared, 1);
    }

    #[test]
    fn test_ready_set_running_dry_halts_as_idle() {
        let mut machine = SimMachine::new();
        machine.load(
            FIRST,
            vec![
                create(0, P1),
                call(Syscall::AwaitEvent {
                    event: Event::Uart1Tx as usize,
                }),
            ],
        );

        let mut kernel = boot(machine);
        assert!(kernel.platform().sources_enabled);
        let shutdown = kernel.run().unwrap();

        // P1 exits right away; the first task is left waiting on an interrupt
        // that never comes.
        assert_eq!(shutdown.reason, ShutdownReason::Idle);
        assert_eq!(state(&kernel, 0), TaskState::EventBlocked);
        assert!(!kernel.platform().sources_enabled);
    }

    #[test]
    fn test_await_event_arms_the_uart_interrupt() {
        let mut machine = SimMachine::new();
        machine.load(
            FIRST,
            vec![call(Syscall::AwaitEvent {
                event: Event::Uart2Modem as usize,
            })],
        );
        machine.load(IDLE, vec![]);
        let config = KernelConfig {
            first_task: TaskSpec::new(FIRST),
            idle: Some(IdleSpec::new(IDLE, STATUS)),
        };
        let mut kernel = Kernel::new(machine, config).unwrap();

        // Run the first task's single step by hand through the dispatcher.
        let tid = kernel.ctx.scheduler.get().unwrap();
        let trap = kernel.activate(tid).unwrap();
        let Trap::Syscall { code, args } = trap else {
            panic!("expected a syscall");
        };
        kernel.handle_syscall(tid, code, args).unwrap();

        assert!(kernel
            .platform()
            .interrupt_armed(Uart::Uart2, UartCondition::ModemStatus));
        assert_eq!(state(&kernel, 0), TaskState::EventBlocked);
        kernel.context().audit().unwrap();
    }

    #[test]
    fn test_unknown_syscall_is_fatal() {
        let mut machine = SimMachine::new();
        machine.load(FIRST, vec![call(Syscall::Pass), Step::Raw(99, [0; 5])]);

        let mut kernel = boot(machine);
        let panic = kernel.run().unwrap_err();

        assert_eq!(panic.error, FatalError::UnknownSyscall(99));
        assert_eq!(panic.tid, Some(Tid(0)));
        assert_eq!(kernel.platform().disabled, 1);
    }

    #[test]
    fn test_unexpected_interrupt_is_fatal() {
        let mut machine = SimMachine::new();
        machine.load(FIRST, vec![Step::Preempt(IrqState::vector(30))]);

        let mut kernel = boot(machine);
        let panic = kernel.run().unwrap_err();
        assert_eq!(panic.error, FatalError::UnexpectedInterrupt(30));
    }

    #[test]
    fn test_task_panic_carries_its_message() {
        let mut machine = SimMachine::new();
        machine.memory.place(0x100, b"out of cheese");
        machine.load(
            FIRST,
            vec![call(Syscall::Panic {
                message: UserBuf::new(0x100, 13),
            })],
        );

        let mut kernel = boot(machine);
        let panic = kernel.run().unwrap_err();
        assert_eq!(panic.to_string(), "kernel panic in task 0: Task panic: out of cheese");
    }

    #[test]
    fn test_quit_halts_with_tasks_still_ready() {
        let mut machine = SimMachine::new();
        machine.load(FIRST, vec![create(9, P1), call(Syscall::Quit)]);

        let mut kernel = boot(machine);
        let shutdown = kernel.run().unwrap();

        assert_eq!(shutdown.reason, ShutdownReason::Quit);
        assert_eq!(state(&kernel, 1), TaskState::Ready);
        assert_eq!(kernel.platform().disabled, 1);
    }

    #[test]
    fn test_exit_with_blocked_tasks_left_halts_when_ready_set_empties() {
        let mut machine = SimMachine::new();
        machine.load(
            FIRST,
            vec![
                create(3, P1),
                call(Syscall::Receive {
                    sender_out: UserPtr(0x50),
                    buf: UserBuf::new(0x60, 1),
                }),
            ],
        );

        let mut kernel = boot(machine);
        let shutdown = kernel.run().unwrap();

        assert_eq!(shutdown.reason, ShutdownReason::AllExited);
        assert_eq!(state(&kernel, 0), TaskState::ReceiveBlocked);
        assert_eq!(state(&kernel, 1), TaskState::Exited);
    }

    #[test]
    fn test_blocking_states_follow_the_protocol() {
        let mut machine = SimMachine::new();
        machine.load(
            FIRST,
            vec![
                create(2, P1),
                create(2, P2),
                call(Syscall::Receive {
                    sender_out: UserPtr(0x50),
                    buf: UserBuf::new(0x60, 1),
                }),
            ],
        );
        // P1 sends to P2, which never receives.
        machine.load(
            P1,
            vec![call(Syscall::Send {
                target: 2,
                msg: UserBuf::new(0x70, 1),
                reply: UserBuf::new(0x80, 1),
            })],
        );
        // P2 sends to the first task, which is parked in Receive.
        machine.load(
            P2,
            vec![
                call(Syscall::Send {
                    target: 0,
                    msg: UserBuf::new(0x70, 1),
                    reply: UserBuf::new(0x80, 1),
                }),
            ],
        );

        let mut kernel = boot(machine);
        let step = |kernel: &mut Kernel<SimMachine>| {
            let next = kernel.ctx.scheduler.get().unwrap();
            let Trap::Syscall { code, args } = kernel.activate(next).unwrap() else {
                panic!("expected a syscall");
            };
            kernel.handle_syscall(next, code, args).unwrap();
            kernel.context().audit().unwrap();
            next
        };

        assert_eq!(step(&mut kernel), Tid(0)); // create P1
        assert_eq!(step(&mut kernel), Tid(0)); // create P2
        assert_eq!(step(&mut kernel), Tid(0)); // receive, nobody sending
        assert_eq!(state(&kernel, 0), TaskState::ReceiveBlocked);

        assert_eq!(step(&mut kernel), Tid(1)); // send to P2, not receiving
        assert_eq!(state(&kernel, 1), TaskState::SendBlocked);

        assert_eq!(step(&mut kernel), Tid(2)); // send to receiver
        assert_eq!(state(&kernel, 2), TaskState::ReplyBlocked);
        assert_eq!(state(&kernel, 0), TaskState::Ready);
    }

    #[test]
    fn test_idle_task_sees_status_and_busy_time_is_reported() {
        let mut machine = SimMachine::new();
        machine.load(
            FIRST,
            vec![
                call(Syscall::AwaitEvent { event: 0 }),
                call(Syscall::Pass),
            ],
        );
        machine.load(
            IDLE,
            vec![
                Step::Preempt(IrqState::timer()),
                call(Syscall::Pass),
            ],
        );
        let config = KernelConfig {
            first_task: TaskSpec::new(FIRST),
            idle: Some(IdleSpec::new(IDLE, STATUS)),
        };

        let mut kernel = Kernel::new(machine, config).unwrap();
        let shutdown = kernel.run().unwrap();
        let sim = kernel.platform();

        // first(await) idle(tick) first(pass) first(exit) idle(pass) idle(exit)
        assert_eq!(
            sim.trace,
            vec![Tid(0), Tid(1), Tid(0), Tid(0), Tid(1), Tid(1)]
        );
        assert_eq!(shutdown.reason, ShutdownReason::AllExited);
        // Each activation takes 10 ticks; three of them were the first task's.
        assert_eq!(shutdown.report.uptime, 60);
        assert_eq!(shutdown.report.non_idle_time, 30);

        // Last publication: nobody awaits an event, 30 busy ticks so far.
        assert_eq!(sim.memory.bytes(STATUS, 1), &[1]);
        assert_eq!(sim.memory.bytes(STATUS + 4, 4), &30u32.to_le_bytes());
    }

    #[test]
    fn test_audit_catches_a_task_in_two_queues() {
        let machine = SimMachine::new();
        let mut kernel = boot(machine);
        kernel.context().audit().unwrap();

        let ctx = &mut kernel.ctx;
        let td = ctx.tasks.expect_mut(Tid(0)).unwrap();
        ctx.scheduler.put(td).unwrap();

        assert!(matches!(
            kernel.context().audit(),
            Err(FatalError::Corrupted(_))
        ));
    }
}
