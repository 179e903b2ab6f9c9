//! TI-84 Plus CE Peripheral Emulation
//!
//! This module contains the port-mapped peripheral controllers:
//! - SPI display panel (port range 0xD, 0xD000-0xDFFF)

pub mod spi;

pub use spi::{SerialWord, SpiPanel, INQUIRY_RESPONSE, NUM_COLS, NUM_ROWS};

/// Port range selector (bits 12-15 of the port address) of the SPI panel
pub const SPI_PORT_RANGE: u16 = 0xD;
/// Offset mask within a port range
pub const PORT_OFFSET_MASK: u16 = 0xFFF;

/// Split a port address into (range, offset)
pub fn decode_port(port: u16) -> (u16, u16) {
    (port >> 12, port & PORT_OFFSET_MASK)
}
