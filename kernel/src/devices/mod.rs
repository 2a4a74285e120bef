//! Devices the kernel drives for itself. Everything tasks reach goes through
//! [`crate::platform`] instead.

#[cfg(target_arch = "x86_64")]
pub mod serial;
