//! `log` backend for the kernel.
//!
//! Records are formatted as `[LEVEL] message` and handed to a console
//! function. The kernel has no idea where that goes; on x86_64 it is usually
//! [`crate::serial::_print`]. Until a console is installed records are dropped.

use core::fmt;

use log::{LevelFilter, Log, Metadata, Record};
use spin::Mutex;

/// Sink for one formatted line.
pub type Console = fn(fmt::Arguments);

/// Global logger instance available throughout the kernel
pub static LOGGER: Logger = Logger::new();

pub struct Logger {
    console: Mutex<Option<Console>>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    pub const fn new() -> Logger {
        Logger {
            console: Mutex::new(None),
        }
    }

    pub fn set_console(&self, console: Console) {
        *self.console.lock() = Some(console);
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // Holding the lock keeps lines from interleaving.
        let console = self.console.lock();
        if let Some(write) = *console {
            write(format_args!("[{}] {}\n", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

/// Debug builds log kernel internals, release builds only boot and halt.
pub fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Routes the `log` macros to `console`. Fails if a logger is already set.
pub fn init(console: Console, level: LevelFilter) -> Result<(), log::SetLoggerError> {
    LOGGER.set_console(console);
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
