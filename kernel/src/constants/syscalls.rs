// Syscall numbers
pub const SYSCALL_EXIT: u32 = 0;
pub const SYSCALL_PASS: u32 = 1;
pub const SYSCALL_CREATE: u32 = 2;
pub const SYSCALL_MYTID: u32 = 3;
pub const SYSCALL_PARENTTID: u32 = 4;
pub const SYSCALL_SEND: u32 = 5;
pub const SYSCALL_RECEIVE: u32 = 6;
pub const SYSCALL_REPLY: u32 = 7;
pub const SYSCALL_AWAITEVENT: u32 = 8;
pub const SYSCALL_PANIC: u32 = 9;
pub const SYSCALL_QUIT: u32 = 10;

/// Number of argument registers captured on every trap.
pub const SYSCALL_ARG_COUNT: usize = 5;

/// Returned by MyParentTid for a task created by the kernel itself.
pub const NO_PARENT: isize = -1;

/// Longest panic message the kernel copies out of a task.
pub const PANIC_MESSAGE_CAPACITY: usize = 128;
