use core::fmt::Debug;

use embedded_hal::{delay::DelayNs, i2c::I2c};
use hd44780_i2c::{DriverResult, Hd44780};
use log::warn;
use meteoclock_core::display::DisplaySurface;

/// Board-level 1602 LCD adapter.
///
/// Panel faults are logged once and otherwise dropped; the clock keeps
/// running even with the display unplugged.
#[derive(Debug)]
pub struct LcdSurface<I2C, D> {
    lcd: Hd44780<I2C>,
    delay: D,
    fault_logged: bool,
}

impl<I2C, D> LcdSurface<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(lcd: Hd44780<I2C>, delay: D) -> Self {
        Self {
            lcd,
            delay,
            fault_logged: false,
        }
    }

    pub fn initialize(&mut self) -> DriverResult<I2C::Error> {
        self.lcd.initialize(&mut self.delay)
    }

    fn note_fault<E: Debug>(&mut self, op: &str, err: E) {
        if self.fault_logged {
            return;
        }
        self.fault_logged = true;
        warn!("display: {} failed err={:?}; further faults muted", op, err);
    }
}

impl<I2C, D> DisplaySurface for LcdSurface<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    fn write_at(&mut self, row: u8, col: u8, text: &str) {
        if let Err(err) = self.lcd.write_str_at(row, col, text) {
            self.note_fault("write", err);
        }
    }

    fn set_backlight(&mut self, on: bool) {
        if let Err(err) = self.lcd.set_backlight(on) {
            self.note_fault("backlight", err);
        }
    }

    fn clear(&mut self) {
        if let Err(err) = self.lcd.clear(&mut self.delay) {
            self.note_fault("clear", err);
        }
    }
}
