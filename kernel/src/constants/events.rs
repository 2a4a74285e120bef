//! Event system configuration constants.

/// Number of wait queues in the event handler.
/// Every awaitable event kind indexes one of these; the rest stay unused.
pub const MAX_EVENTS: usize = 16;

/// Value delivered to tasks woken by a timer tick.
pub const TIMER_EVENT_DATA: i32 = 0;
