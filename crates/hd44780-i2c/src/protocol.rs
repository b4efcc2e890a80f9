//! Wire-level helpers for an HD44780 controller behind a PCF8574 I2C expander.
//!
//! Expander bit layout (the common "LCM1602" backpack):
//! - P0: RS
//! - P1: R/W (always low, the driver never reads)
//! - P2: EN
//! - P3: backlight transistor
//! - P4..P7: D4..D7

/// Default 7-bit I2C address of the backpack (A0..A2 pulled high).
pub const DEFAULT_ADDRESS: u8 = 0x27;
/// Columns of a 1602 panel.
pub const COLUMNS: u8 = 16;
/// Rows of a 1602 panel.
pub const ROWS: u8 = 2;

pub const BIT_RS: u8 = 0x01;
pub const BIT_EN: u8 = 0x04;
pub const BIT_BACKLIGHT: u8 = 0x08;

pub const CMD_CLEAR: u8 = 0x01;
pub const CMD_ENTRY_MODE: u8 = 0x04;
pub const CMD_DISPLAY_CONTROL: u8 = 0x08;
pub const CMD_FUNCTION_SET: u8 = 0x20;
pub const CMD_SET_DDRAM: u8 = 0x80;

pub const ENTRY_INCREMENT: u8 = 0x02;
pub const DISPLAY_ON: u8 = 0x04;
pub const FUNCTION_TWO_LINES: u8 = 0x08;

/// DDRAM start address of each row.
const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

/// Glyph in the A00 character ROM for the degree sign.
pub const GLYPH_DEGREE: u8 = 0xDF;
/// Glyph used for characters the ROM cannot show.
pub const GLYPH_UNKNOWN: u8 = b'?';

/// Frames emitted for one byte: high nibble strobe, low nibble strobe.
pub const BYTE_FRAMES: usize = 4;

/// Register selected by the RS line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Register {
    Command,
    Data,
}

#[inline]
const fn control_bits(register: Register, backlight: bool) -> u8 {
    let rs = match register {
        Register::Command => 0,
        Register::Data => BIT_RS,
    };
    rs | if backlight { BIT_BACKLIGHT } else { 0 }
}

/// Builds the EN-high / EN-low frame pair latching one nibble.
#[inline]
pub const fn nibble_frames(nibble: u8, register: Register, backlight: bool) -> [u8; 2] {
    let base = ((nibble & 0x0F) << 4) | control_bits(register, backlight);
    [base | BIT_EN, base]
}

/// Builds the four expander frames that transfer `byte` in 4-bit mode.
#[inline]
pub const fn byte_frames(byte: u8, register: Register, backlight: bool) -> [u8; BYTE_FRAMES] {
    let high = nibble_frames(byte >> 4, register, backlight);
    let low = nibble_frames(byte, register, backlight);
    [high[0], high[1], low[0], low[1]]
}

/// Expander byte that only drives the backlight line.
#[inline]
pub const fn backlight_frame(backlight: bool) -> u8 {
    if backlight { BIT_BACKLIGHT } else { 0 }
}

/// Builds the set-DDRAM-address command for a cell.
///
/// Returns `None` for cells outside a `columns` x `rows` panel.
#[inline]
pub fn ddram_command(row: u8, col: u8, columns: u8, rows: u8) -> Option<u8> {
    if row >= rows || col >= columns || row as usize >= ROW_OFFSETS.len() {
        return None;
    }

    Some(CMD_SET_DDRAM | (ROW_OFFSETS[row as usize] + col))
}

/// Maps a char onto the A00 character ROM.
#[inline]
pub fn glyph(ch: char) -> u8 {
    match ch {
        '°' => GLYPH_DEGREE,
        ' '..='}' => ch as u8,
        _ => GLYPH_UNKNOWN,
    }
}
