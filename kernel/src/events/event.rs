use core::convert::TryFrom;

use crate::{constants::events::MAX_EVENTS, error::KernelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Uart {
    Uart1,
    Uart2,
}

/// Interrupt conditions a UART can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UartCondition {
    Receive,
    ReceiveTimeout,
    ModemStatus,
    Transmit,
}

/// Awaitable event kinds. The discriminant is the value tasks pass to
/// AwaitEvent and doubles as the controller vector for `Timer`, `Uart1` and
/// `Uart2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Event {
    Timer = 0,
    Uart1 = 1,
    Uart1Modem = 2,
    Uart1Rx = 3,
    Uart1RxTimeout = 4,
    Uart1Tx = 5,
    Uart2 = 6,
    Uart2Rx = 7,
    Uart2RxTimeout = 8,
    Uart2Tx = 9,
    Uart2Modem = 10,
}

impl Event {
    pub const ALL: [Event; 11] = [
        Event::Timer,
        Event::Uart1,
        Event::Uart1Modem,
        Event::Uart1Rx,
        Event::Uart1RxTimeout,
        Event::Uart1Tx,
        Event::Uart2,
        Event::Uart2Rx,
        Event::Uart2RxTimeout,
        Event::Uart2Tx,
        Event::Uart2Modem,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Generic line event of a port.
    pub fn line(port: Uart) -> Event {
        match port {
            Uart::Uart1 => Event::Uart1,
            Uart::Uart2 => Event::Uart2,
        }
    }

    pub fn uart(port: Uart, condition: UartCondition) -> Event {
        match (port, condition) {
            (Uart::Uart1, UartCondition::Receive) => Event::Uart1Rx,
            (Uart::Uart1, UartCondition::ReceiveTimeout) => Event::Uart1RxTimeout,
            (Uart::Uart1, UartCondition::ModemStatus) => Event::Uart1Modem,
            (Uart::Uart1, UartCondition::Transmit) => Event::Uart1Tx,
            (Uart::Uart2, UartCondition::Receive) => Event::Uart2Rx,
            (Uart::Uart2, UartCondition::ReceiveTimeout) => Event::Uart2RxTimeout,
            (Uart::Uart2, UartCondition::ModemStatus) => Event::Uart2Modem,
            (Uart::Uart2, UartCondition::Transmit) => Event::Uart2Tx,
        }
    }

    /// The UART interrupt that must be enabled for this event to ever fire.
    pub fn uart_condition(self) -> Option<(Uart, UartCondition)> {
        match self {
            Event::Uart1Rx => Some((Uart::Uart1, UartCondition::Receive)),
            Event::Uart1RxTimeout => Some((Uart::Uart1, UartCondition::ReceiveTimeout)),
            Event::Uart1Modem => Some((Uart::Uart1, UartCondition::ModemStatus)),
            Event::Uart1Tx => Some((Uart::Uart1, UartCondition::Transmit)),
            Event::Uart2Rx => Some((Uart::Uart2, UartCondition::Receive)),
            Event::Uart2RxTimeout => Some((Uart::Uart2, UartCondition::ReceiveTimeout)),
            Event::Uart2Modem => Some((Uart::Uart2, UartCondition::ModemStatus)),
            Event::Uart2Tx => Some((Uart::Uart2, UartCondition::Transmit)),
            Event::Timer | Event::Uart1 | Event::Uart2 => None,
        }
    }
}

impl TryFrom<usize> for Event {
    type Error = KernelError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if value >= MAX_EVENTS {
            return Err(KernelError::InvalidEvent);
        }
        Event::ALL
            .iter()
            .copied()
            .find(|event| event.index() == value)
            .ok_or(KernelError::InvalidEvent)
    }
}
