//! EP93xx UART interrupt register bits.

/// Modem status interrupt pending.
pub const MIS_MASK: u8 = 0x1;
/// Receive interrupt pending.
pub const RIS_MASK: u8 = 0x2;
/// Transmit interrupt pending.
pub const TIS_MASK: u8 = 0x4;
/// Receive timeout interrupt pending.
pub const RTIS_MASK: u8 = 0x8;

/// Only the low byte of the data register carries the received character.
pub const DATA_MASK: u32 = 0xFF;
