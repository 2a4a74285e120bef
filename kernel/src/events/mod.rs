//! Hardware events tasks can block on, and the wait queues holding them.

mod event;
mod handler;

pub use event::{Event, Uart, UartCondition};
pub use handler::EventHandler;
