//! Non-idle CPU time accounting.
//!
//! Time between two runs of the idle task counts as busy. Diagnostics only;
//! the scheduler never looks at it.

/// Busy time and uptime in clock ticks, reported when the kernel halts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsReport {
    pub non_idle_time: u32,
    pub uptime: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Metrics {
    boot_time: u32,
    non_idle_time: u32,
    last_idle_end: u32,
}

impl Metrics {
    pub fn new(now: u32) -> Self {
        Metrics {
            boot_time: now,
            non_idle_time: 0,
            last_idle_end: now,
        }
    }

    /// Called right before the idle task runs. Returns the busy total so far.
    pub fn idle_starting(&mut self, now: u32) -> u32 {
        let busy = now.wrapping_sub(self.last_idle_end);
        self.non_idle_time = self.non_idle_time.wrapping_add(busy);
        self.non_idle_time
    }

    /// Called as soon as the idle task traps back into the kernel.
    pub fn idle_stopped(&mut self, now: u32) {
        self.last_idle_end = now;
    }

    /// Busy time including the stretch since the idle task last ran.
    pub fn report(&self, now: u32) -> MetricsReport {
        let tail = now.wrapping_sub(self.last_idle_end);
        MetricsReport {
            non_idle_time: self.non_idle_time.wrapping_add(tail),
            uptime: now.wrapping_sub(self.boot_time),
        }
    }
}
