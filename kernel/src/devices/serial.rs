//! 16550 serial console on COM1, the kernel log sink on x86_64 targets.

use core::fmt::{Arguments, Write};

use lazy_static::lazy_static;
use spin::Mutex;
use uart_16550::SerialPort;
use x86_64::instructions::interrupts;

use crate::constants::ports::SERIAL_PORT;

lazy_static! {
    /// The first serial port, initialised on first use.
    pub static ref SERIAL1: Mutex<SerialPort> = {
        let mut serial_port = unsafe { SerialPort::new(SERIAL_PORT) };
        serial_port.init();
        Mutex::new(serial_port)
    };
}

/// Writes to COM1 with interrupts masked so an interrupt can never spin on
/// a lock the interrupted code holds. Output that fails to write is dropped.
#[doc(hidden)]
pub fn _print(args: Arguments) {
    interrupts::without_interrupts(|| {
        let _ = SERIAL1.lock().write_fmt(args);
    });
}

/// Installs COM1 as the kernel log console.
pub fn init_logging(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    crate::logging::init(_print, level)
}

/// Prints formatted text to the serial port.
#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::serial::_print(format_args!($($arg)*))
    };
}

/// Prints formatted text to the serial port, followed by a newline.
#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => ($crate::serial_print!("{}\n", format_args!($($arg)*)));
}
