#![cfg_attr(not(test), no_std)]

//! HD44780 character LCD (PCF8574 I2C backpack) driver primitives.

pub mod protocol;

use embedded_hal::{delay::DelayNs, i2c::I2c};

use protocol::Register;

const POWER_ON_WAIT_US: u32 = 50_000;
const INIT_FIRST_WAIT_US: u32 = 4_500;
const INIT_STEP_WAIT_US: u32 = 150;
const CLEAR_WAIT_US: u32 = 2_000;

/// Driver configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// 7-bit I2C address of the expander.
    pub address: u8,
    pub columns: u8,
    pub rows: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: protocol::DEFAULT_ADDRESS,
            columns: protocol::COLUMNS,
            rows: protocol::ROWS,
        }
    }
}

impl Config {
    pub const fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }
}

/// Driver errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error<I2cErr> {
    /// I2C transaction failed.
    I2c(I2cErr),
    /// Cursor position is outside the panel.
    InvalidInput,
}

pub type DriverResult<I2cErr> = Result<(), Error<I2cErr>>;

/// HD44780 driver in 4-bit mode.
#[derive(Debug)]
pub struct Hd44780<I2C> {
    i2c: I2C,
    config: Config,
    backlight: bool,
}

impl<I2C> Hd44780<I2C>
where
    I2C: I2c,
{
    /// Creates a new driver instance. Nothing is sent until [`Self::initialize`].
    pub fn new(i2c: I2C, config: Config) -> Self {
        Self {
            i2c,
            config,
            backlight: true,
        }
    }

    /// Releases the owned bus.
    pub fn release(self) -> I2C {
        self.i2c
    }

    pub fn backlight(&self) -> bool {
        self.backlight
    }

    /// Runs the 4-bit initialization-by-instruction sequence and turns the
    /// display on with the cursor hidden.
    pub fn initialize<D>(&mut self, delay: &mut D) -> DriverResult<I2C::Error>
    where
        D: DelayNs,
    {
        delay.delay_us(POWER_ON_WAIT_US);
        self.write_raw(&[protocol::backlight_frame(self.backlight)])?;

        // Force 8-bit mode three times, then switch to 4-bit.
        self.write_nibble(0x03)?;
        delay.delay_us(INIT_FIRST_WAIT_US);
        self.write_nibble(0x03)?;
        delay.delay_us(INIT_STEP_WAIT_US);
        self.write_nibble(0x03)?;
        delay.delay_us(INIT_STEP_WAIT_US);
        self.write_nibble(0x02)?;
        delay.delay_us(INIT_STEP_WAIT_US);

        self.command(protocol::CMD_FUNCTION_SET | protocol::FUNCTION_TWO_LINES)?;
        self.command(protocol::CMD_DISPLAY_CONTROL | protocol::DISPLAY_ON)?;
        self.clear(delay)?;
        self.command(protocol::CMD_ENTRY_MODE | protocol::ENTRY_INCREMENT)
    }

    /// Blanks DDRAM and homes the cursor.
    pub fn clear<D>(&mut self, delay: &mut D) -> DriverResult<I2C::Error>
    where
        D: DelayNs,
    {
        self.command(protocol::CMD_CLEAR)?;
        delay.delay_us(CLEAR_WAIT_US);
        Ok(())
    }

    /// Drives the backlight line; applied immediately.
    pub fn set_backlight(&mut self, on: bool) -> DriverResult<I2C::Error> {
        self.backlight = on;
        self.write_raw(&[protocol::backlight_frame(on)])
    }

    /// Moves the DDRAM cursor to `row`, `col` (both zero-based).
    pub fn set_cursor(&mut self, row: u8, col: u8) -> DriverResult<I2C::Error> {
        let command =
            protocol::ddram_command(row, col, self.config.columns, self.config.rows)
                .ok_or(Error::InvalidInput)?;
        self.command(command)
    }

    /// Writes text at the cursor, clipped at the end of the row.
    ///
    /// Returns the number of cells written.
    pub fn write_str_at(&mut self, row: u8, col: u8, text: &str) -> Result<usize, Error<I2C::Error>> {
        self.set_cursor(row, col)?;

        let room = self.config.columns.saturating_sub(col) as usize;
        let mut written = 0usize;
        for ch in text.chars().take(room) {
            self.data(protocol::glyph(ch))?;
            written += 1;
        }

        Ok(written)
    }

    fn command(&mut self, byte: u8) -> DriverResult<I2C::Error> {
        self.write_raw(&protocol::byte_frames(byte, Register::Command, self.backlight))
    }

    fn data(&mut self, byte: u8) -> DriverResult<I2C::Error> {
        self.write_raw(&protocol::byte_frames(byte, Register::Data, self.backlight))
    }

    fn write_nibble(&mut self, nibble: u8) -> DriverResult<I2C::Error> {
        self.write_raw(&protocol::nibble_frames(
            nibble,
            Register::Command,
            self.backlight,
        ))
    }

    fn write_raw(&mut self, frames: &[u8]) -> DriverResult<I2C::Error> {
        self.i2c
            .write(self.config.address, frames)
            .map_err(Error::I2c)
    }
}
