//! A single-core microkernel: strict-priority preemptive scheduling,
//! synchronous Send/Receive/Reply message passing and interrupt-driven event
//! notification.
//!
//! The kernel owns no hardware. Everything architecture specific (saving and
//! restoring task registers, touching device registers, reading the clock) is
//! injected through [`platform::Platform`].

#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod constants;
pub mod devices;
pub mod error;
pub mod events;
pub mod interrupts;
pub mod ipc;
pub mod kernel;
pub mod logging;
pub mod metrics;
pub mod platform;
pub mod queue;
pub mod scheduler;
pub mod syscalls;
pub mod tasks;

#[cfg(target_arch = "x86_64")]
pub use devices::serial;

pub use error::{FatalError, KernelError, KernelPanic, Shutdown, ShutdownReason};
pub use kernel::{IdleSpec, Kernel, KernelConfig, TaskSpec};
pub use platform::Platform;
pub use tasks::{Priority, Tid};
