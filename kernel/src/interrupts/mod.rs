//! Turns a hardware interrupt into the events it signals.
//!
//! The controller reports which source fired through its vector register;
//! for the UARTs the interrupt identification register then tells which
//! condition. Conditions are serviced one per interrupt, in the order
//! receive, receive timeout, modem status, transmit.

use arrayvec::ArrayVec;
use log::trace;

use crate::{
    constants::{
        events::TIMER_EVENT_DATA,
        uart::{DATA_MASK, MIS_MASK, RIS_MASK, RTIS_MASK, TIS_MASK},
    },
    error::FatalError,
    events::{Event, Uart, UartCondition},
    platform::InterruptController,
};

/// One event to broadcast, with the value every waiter receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub event: Event,
    pub data: i32,
}

/// At most a specific UART condition plus the port's line event.
pub type Deliveries = ArrayVec<Delivery, 2>;

/// Services the pending interrupt: silences its source, acknowledges the
/// controller and reports what to deliver.
pub fn decode(hw: &mut impl InterruptController) -> Result<Deliveries, FatalError> {
    let vector = hw.pending_vector();
    let mut deliveries = Deliveries::new();

    if vector == Event::Timer as u32 {
        hw.clear_timer();
        deliveries.push(Delivery {
            event: Event::Timer,
            data: TIMER_EVENT_DATA,
        });
    } else if vector == Event::Uart1 as u32 {
        decode_uart(hw, Uart::Uart1, &mut deliveries)?;
    } else if vector == Event::Uart2 as u32 {
        decode_uart(hw, Uart::Uart2, &mut deliveries)?;
    } else {
        return Err(FatalError::UnexpectedInterrupt(vector));
    }

    hw.acknowledge();
    trace!("interrupt vector {} -> {:?}", vector, deliveries);
    Ok(deliveries)
}

fn decode_uart(
    hw: &mut impl InterruptController,
    port: Uart,
    deliveries: &mut Deliveries,
) -> Result<(), FatalError> {
    let status = hw.uart_status(port);

    let (condition, data) = if status & RIS_MASK != 0 {
        (UartCondition::Receive, (hw.uart_data(port) & DATA_MASK) as i32)
    } else if status & RTIS_MASK != 0 {
        (
            UartCondition::ReceiveTimeout,
            (hw.uart_data(port) & DATA_MASK) as i32,
        )
    } else if status & MIS_MASK != 0 {
        // Modem status stays asserted until cleared; re-armed by the next waiter.
        let flags = hw.uart_flags(port);
        hw.uart_set_interrupt(port, UartCondition::ModemStatus, false);
        hw.uart_clear_modem_status(port);
        (UartCondition::ModemStatus, flags as i32)
    } else if status & TIS_MASK != 0 {
        // Transmit-ready holds while the FIFO is empty; re-armed by the next waiter.
        hw.uart_set_interrupt(port, UartCondition::Transmit, false);
        (UartCondition::Transmit, 0)
    } else {
        return Err(FatalError::UnexpectedUartStatus { port, status });
    };

    deliveries.push(Delivery {
        event: Event::uart(port, condition),
        data,
    });
    deliveries.push(Delivery {
        event: Event::line(port),
        data: status as i32,
    });
    Ok(())
}

/// Unmasks the UART interrupt `event` depends on, if any.
pub fn arm(hw: &mut impl InterruptController, event: Event) {
    if let Some((port, condition)) = event.uart_condition() {
        hw.uart_set_interrupt(port, condition, true);
    }
}
