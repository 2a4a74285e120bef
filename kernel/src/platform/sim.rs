//! Scripted stand-in for real hardware, used by the kernel's tests.
//!
//! Each task runs a program: a list of syscalls and preemptions indexed by
//! its entry point. Activating a task executes the next step and traps back.
//! A task that runs off the end of its program exits.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    events::{Event, Uart, UartCondition},
    ipc::UserPtr,
    syscalls::{Syscall, SyscallArgs},
    tasks::Tid,
};

use super::{Clock, ContextSwitch, InterruptController, Trap, UserMemory};

/// Zero-initialised byte arena addressed from 0.
#[derive(Debug, Clone)]
pub struct SimMemory {
    bytes: Vec<u8>,
}

impl SimMemory {
    pub fn new(size: usize) -> Self {
        SimMemory {
            bytes: vec![0; size],
        }
    }

    pub fn place(&mut self, addr: usize, bytes: &[u8]) {
        self.bytes[addr..addr + bytes.len()].copy_from_slice(bytes);
    }

    pub fn bytes(&self, addr: usize, len: usize) -> &[u8] {
        &self.bytes[addr..addr + len]
    }
}

impl UserMemory for SimMemory {
    fn copy(&mut self, src: UserPtr, dst: UserPtr, len: usize) {
        self.bytes.copy_within(src.0..src.0 + len, dst.0);
    }

    fn read(&self, src: UserPtr, buf: &mut [u8]) {
        buf.copy_from_slice(&self.bytes[src.0..src.0 + buf.len()]);
    }

    fn write(&mut self, dst: UserPtr, bytes: &[u8]) {
        self.place(dst.0, bytes);
    }
}

/// Interrupt registers as seen while servicing one interrupt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IrqState {
    pub vector: u32,
    pub status: u8,
    pub data: u32,
    pub flags: u32,
}

impl IrqState {
    pub fn vector(vector: u32) -> Self {
        IrqState {
            vector,
            ..Default::default()
        }
    }

    pub fn timer() -> Self {
        Self::vector(Event::Timer as u32)
    }

    pub fn uart(port: Uart, status: u8) -> Self {
        IrqState {
            status,
            ..Self::vector(Event::line(port) as u32)
        }
    }

    pub fn with_data(self, data: u32) -> Self {
        IrqState { data, ..self }
    }

    pub fn with_flags(self, flags: u32) -> Self {
        IrqState { flags, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Call(Syscall),
    /// A trap with an arbitrary code, for exercising the decoder.
    Raw(u32, SyscallArgs),
    /// A hardware interrupt arrives while the task runs.
    Preempt(IrqState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resume {
    Start,
    Syscall,
    Interrupt,
}

#[derive(Debug)]
pub struct SimContext {
    entry: usize,
    pc: usize,
    resume: Resume,
}

pub struct SimMachine {
    pub memory: SimMemory,
    programs: BTreeMap<usize, Vec<Step>>,
    /// Syscall results each task resumed with, in order.
    pub returns: BTreeMap<Tid, Vec<isize>>,
    /// Every activation, in order.
    pub trace: Vec<Tid>,
    irq: IrqState,
    armed: BTreeSet<(Uart, UartCondition)>,
    pub sources_enabled: bool,
    pub disabled: usize,
    pub acknowledged: usize,
    pub timer_cleared: usize,
    pub modem_cleared: Vec<Uart>,
    clock: u32,
    /// Clock ticks each activation consumes.
    pub tick: u32,
}

impl Default for SimMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimMachine {
    pub fn new() -> Self {
        SimMachine {
            memory: SimMemory::new(4096),
            programs: BTreeMap::new(),
            returns: BTreeMap::new(),
            trace: Vec::new(),
            irq: IrqState::default(),
            armed: BTreeSet::new(),
            sources_enabled: false,
            disabled: 0,
            acknowledged: 0,
            timer_cleared: 0,
            modem_cleared: Vec::new(),
            clock: 0,
            tick: 10,
        }
    }

    pub fn load(&mut self, entry: usize, steps: Vec<Step>) {
        self.programs.insert(entry, steps);
    }

    /// Latches `irq` as the interrupt being serviced.
    pub fn raise(&mut self, irq: IrqState) {
        self.irq = irq;
    }

    pub fn interrupt_armed(&self, port: Uart, condition: UartCondition) -> bool {
        self.armed.contains(&(port, condition))
    }

    pub fn returns_of(&self, tid: Tid) -> &[isize] {
        self.returns.get(&tid).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl ContextSwitch for SimMachine {
    type Context = SimContext;

    fn initial_context(&mut self, _tid: Tid, entry: usize) -> SimContext {
        SimContext {
            entry,
            pc: 0,
            resume: Resume::Start,
        }
    }

    fn activate(&mut self, tid: Tid, context: &mut SimContext, return_value: Option<isize>) -> Trap {
        self.trace.push(tid);
        self.clock = self.clock.wrapping_add(self.tick);

        match context.resume {
            Resume::Start => assert_eq!(return_value, Some(0), "task {} started without r0 = 0", tid),
            Resume::Syscall => {
                let value = return_value
                    .unwrap_or_else(|| panic!("task {} resumed from a syscall without a result", tid));
                self.returns.entry(tid).or_default().push(value);
            }
            Resume::Interrupt => assert_eq!(
                return_value, None,
                "task {} had its registers overwritten after an interrupt", tid
            ),
        }

        let step = self
            .programs
            .get(&context.entry)
            .and_then(|program| program.get(context.pc))
            .copied()
            .unwrap_or(Step::Call(Syscall::Exit));
        context.pc += 1;

        match step {
            Step::Call(call) => {
                context.resume = Resume::Syscall;
                let (code, args) = call.encode();
                Trap::Syscall { code, args }
            }
            Step::Raw(code, args) => {
                context.resume = Resume::Syscall;
                Trap::Syscall { code, args }
            }
            Step::Preempt(irq) => {
                context.resume = Resume::Interrupt;
                self.irq = irq;
                Trap::Interrupt
            }
        }
    }
}

impl UserMemory for SimMachine {
    fn copy(&mut self, src: UserPtr, dst: UserPtr, len: usize) {
        self.memory.copy(src, dst, len);
    }

    fn read(&self, src: UserPtr, buf: &mut [u8]) {
        self.memory.read(src, buf);
    }

    fn write(&mut self, dst: UserPtr, bytes: &[u8]) {
        self.memory.write(dst, bytes);
    }
}

impl InterruptController for SimMachine {
    fn enable_sources(&mut self) {
        self.sources_enabled = true;
    }

    fn disable_all(&mut self) {
        self.sources_enabled = false;
        self.armed.clear();
        self.disabled += 1;
    }

    fn pending_vector(&mut self) -> u32 {
        self.irq.vector
    }

    fn acknowledge(&mut self) {
        self.acknowledged += 1;
    }

    fn clear_timer(&mut self) {
        self.timer_cleared += 1;
    }

    fn uart_status(&mut self, port: Uart) -> u8 {
        if self.irq.vector == Event::line(port) as u32 {
            self.irq.status
        } else {
            0
        }
    }

    fn uart_data(&mut self, _port: Uart) -> u32 {
        self.irq.data
    }

    fn uart_flags(&mut self, _port: Uart) -> u32 {
        self.irq.flags
    }

    fn uart_clear_modem_status(&mut self, port: Uart) {
        self.modem_cleared.push(port);
    }

    fn uart_set_interrupt(&mut self, port: Uart, condition: UartCondition, enabled: bool) {
        if enabled {
            self.armed.insert((port, condition));
        } else {
            self.armed.remove(&(port, condition));
        }
    }
}

impl Clock for SimMachine {
    fn now(&self) -> u32 {
        self.clock
    }
}
