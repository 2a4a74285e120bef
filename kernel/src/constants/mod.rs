//! System-wide constants and hardware-specific values.

pub mod events;
pub mod ports;
pub mod syscalls;
pub mod tasks;
pub mod uart;
