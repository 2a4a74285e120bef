//! Task table and scheduler limits.

/// Total number of tasks that can ever be created per boot.
/// Slots are never reclaimed, so this also bounds creations.
pub const MAX_TASKS: usize = 64;

/// Number of priority levels. 0 is the highest, `NUM_PRIORITIES - 1` the lowest.
/// Must not exceed the width of the scheduler bitmap.
pub const NUM_PRIORITIES: usize = 64;

/// Priority of the first user task started at boot.
pub const FIRST_TASK_PRIORITY: u8 = 1;

/// Priority of the idle task started at boot.
pub const IDLE_TASK_PRIORITY: u8 = 28;

/// Offset of the "nothing awaits an event" flag in the idle status block.
pub const IDLE_STATUS_EXIT_OFFSET: usize = 0;

/// Offset of the little-endian u32 non-idle time in the idle status block.
pub const IDLE_STATUS_TIME_OFFSET: usize = 4;
