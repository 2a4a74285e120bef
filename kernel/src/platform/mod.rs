//! Hardware capabilities the kernel is built on.
//!
//! The kernel never touches registers or task memory directly. A target
//! provides one type implementing all four traits below; it then implements
//! [`Platform`] automatically.

use crate::{
    constants::syscalls::SYSCALL_ARG_COUNT,
    events::{Uart, UartCondition},
    ipc::UserPtr,
    tasks::Tid,
};

#[cfg(test)]
pub mod sim;

/// Why control came back to the kernel after activating a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    /// The task executed a software interrupt.
    Syscall {
        code: u32,
        args: [usize; SYSCALL_ARG_COUNT],
    },
    /// A hardware interrupt preempted the task.
    Interrupt,
}

/// Saving and restoring task register state.
pub trait ContextSwitch {
    /// Saved registers of one task. Opaque to the kernel.
    type Context;

    /// Lays out the registers and stack of a task that has not run yet, so
    /// that its first activation starts executing at `entry`.
    fn initial_context(&mut self, tid: Tid, entry: usize) -> Self::Context;

    /// Runs the task until it traps back into the kernel.
    ///
    /// When `return_value` is set it becomes the result of the syscall the
    /// task is resuming from; a task resuming from an interrupt gets `None`
    /// and its registers back untouched.
    fn activate(
        &mut self,
        tid: Tid,
        context: &mut Self::Context,
        return_value: Option<isize>,
    ) -> Trap;
}

/// Byte-level access to task memory. There is a single address space and no
/// protection; addresses are whatever the tasks passed in.
pub trait UserMemory {
    fn copy(&mut self, src: UserPtr, dst: UserPtr, len: usize);
    fn read(&self, src: UserPtr, buf: &mut [u8]);
    fn write(&mut self, dst: UserPtr, bytes: &[u8]);
}

/// Vectored interrupt controller plus the interrupt registers of the two UARTs
/// and the tick timer.
pub trait InterruptController {
    /// Routes the timer and both UARTs through the vectored controller.
    fn enable_sources(&mut self);
    /// Masks every source and stops the tick timer.
    fn disable_all(&mut self);
    /// Vector of the interrupt being serviced.
    fn pending_vector(&mut self) -> u32;
    /// Signals end of service to the controller.
    fn acknowledge(&mut self);
    fn clear_timer(&mut self);
    /// Interrupt identification register of `port`.
    fn uart_status(&mut self, port: Uart) -> u8;
    /// Data register; reading it clears a receive interrupt.
    fn uart_data(&mut self, port: Uart) -> u32;
    fn uart_flags(&mut self, port: Uart) -> u32;
    fn uart_clear_modem_status(&mut self, port: Uart);
    fn uart_set_interrupt(&mut self, port: Uart, condition: UartCondition, enabled: bool);
}

/// Free-running tick counter.
pub trait Clock {
    fn now(&self) -> u32;
}

pub trait Platform: ContextSwitch + UserMemory + InterruptController + Clock {}

impl<T: ContextSwitch + UserMemory + InterruptController + Clock> Platform for T {}

/// [`UserMemory`] for targets where task addresses are plain physical
/// addresses in the kernel's own address space.
#[derive(Debug, Default)]
pub struct FlatMemory;

impl UserMemory for FlatMemory {
    fn copy(&mut self, src: UserPtr, dst: UserPtr, len: usize) {
        unsafe {
            core::ptr::copy(src.0 as *const u8, dst.0 as *mut u8, len);
        }
    }

    fn read(&self, src: UserPtr, buf: &mut [u8]) {
        unsafe {
            core::ptr::copy_nonoverlapping(src.0 as *const u8, buf.as_mut_ptr(), buf.len());
        }
    }

    fn write(&mut self, dst: UserPtr, bytes: &[u8]) {
        unsafe {
            core::ptr::copy_nonoverlapping(bytes.as_ptr(), dst.0 as *mut u8, bytes.len());
        }
    }
}
