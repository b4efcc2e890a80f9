//! 16x2 layout, the display seam and the partial clock refresh.
//!
//! ```text
//! |JSON e    21.7°C|
//! |15.01  12:34:56 |
//! ```

use core::fmt::Write;

use heapless::String;

use crate::{clock::Timestamp, weather::TemperatureReading};

pub const COLUMNS: u8 = 16;
pub const ROWS: u8 = 2;

/// Error token field, left-aligned.
pub const STATUS_ROW: u8 = 0;
pub const STATUS_COL: u8 = 0;
pub const STATUS_WIDTH: usize = 6;

/// Temperature field, right-aligned so a typical `21.7°C` starts at column 10.
pub const TEMPERATURE_ROW: u8 = 0;
pub const TEMPERATURE_COL: u8 = 9;
pub const TEMPERATURE_WIDTH: usize = (COLUMNS - TEMPERATURE_COL) as usize;

/// `dd.MM  hh:mm:ss`
pub const CLOCK_ROW: u8 = 1;
pub const CLOCK_COL: u8 = 0;
pub const SECONDS_COL: u8 = 13;

/// Text for one row; sized in bytes so multi-byte glyphs fit.
pub type Cells = String<32>;

/// Cursor-addressed character display.
///
/// Text running past the last column is clipped by the implementation.
pub trait DisplaySurface {
    fn write_at(&mut self, row: u8, col: u8, text: &str);
    fn set_backlight(&mut self, on: bool);
    fn clear(&mut self);
}

impl<T: DisplaySurface + ?Sized> DisplaySurface for &mut T {
    fn write_at(&mut self, row: u8, col: u8, text: &str) {
        (**self).write_at(row, col, text)
    }

    fn set_backlight(&mut self, on: bool) {
        (**self).set_backlight(on)
    }

    fn clear(&mut self) {
        (**self).clear()
    }
}

/// Cells that need repainting after observing a new clock reading.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClockRedraw {
    Unchanged,
    /// Same minute, new second: only the two seconds digits.
    Seconds(u8),
    /// New minute (or invalidated state): the whole date/time row.
    Row(Timestamp),
}

impl ClockRedraw {
    pub fn paint<D: DisplaySurface>(&self, display: &mut D) {
        match *self {
            Self::Unchanged => {}
            Self::Seconds(second) => {
                display.write_at(CLOCK_ROW, SECONDS_COL, &two_digits(second));
            }
            Self::Row(now) => {
                display.write_at(CLOCK_ROW, CLOCK_COL, &clock_row(&now));
            }
        }
    }
}

/// What the panel currently shows, as far as the loop needs to know.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayState {
    last_second: Option<u8>,
    last_minute: Option<u8>,
    backlight: bool,
    temperature: Option<TemperatureReading>,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayState {
    pub const fn new() -> Self {
        Self {
            last_second: None,
            last_minute: None,
            backlight: true,
            temperature: None,
        }
    }

    /// Forgets the rendered second/minute so the next observation redraws the row.
    pub fn invalidate_clock(&mut self) {
        self.last_second = None;
        self.last_minute = None;
    }

    pub const fn backlight(&self) -> bool {
        self.backlight
    }

    /// Flips the backlight flag and returns the new state.
    pub fn toggle_backlight(&mut self) -> bool {
        self.backlight = !self.backlight;
        self.backlight
    }

    pub const fn temperature(&self) -> Option<TemperatureReading> {
        self.temperature
    }

    pub fn set_temperature(&mut self, reading: TemperatureReading) {
        self.temperature = Some(reading);
    }

    pub fn diff(&self, now: &Timestamp) -> ClockRedraw {
        if self.last_second == Some(now.second) {
            return ClockRedraw::Unchanged;
        }
        if self.last_minute == Some(now.minute) {
            return ClockRedraw::Seconds(now.second);
        }
        ClockRedraw::Row(*now)
    }

    /// Diffs against `now` and records it as rendered.
    pub fn observe(&mut self, now: &Timestamp) -> ClockRedraw {
        let redraw = self.diff(now);
        match redraw {
            ClockRedraw::Unchanged => {}
            ClockRedraw::Seconds(second) => self.last_second = Some(second),
            ClockRedraw::Row(now) => {
                self.last_second = Some(now.second);
                self.last_minute = Some(now.minute);
            }
        }
        redraw
    }
}

pub fn clock_row(now: &Timestamp) -> Cells {
    let mut out = Cells::new();
    let _ = write!(
        out,
        "{:02}.{:02}  {:02}:{:02}:{:02}",
        now.day, now.month, now.hour, now.minute, now.second
    );
    out
}

pub fn two_digits(value: u8) -> Cells {
    let mut out = Cells::new();
    let _ = write!(out, "{:02}", value);
    out
}

pub fn temperature_field(reading: TemperatureReading) -> Cells {
    let mut celsius = reading.celsius();
    // Values that round to zero would otherwise print as "-0.0".
    if celsius > -0.05 && celsius <= 0.0 {
        celsius = 0.0;
    }
    let mut value = Cells::new();
    let _ = write!(value, "{:.1}°C", celsius);
    pad_left(&value, TEMPERATURE_WIDTH)
}

pub fn status_field(token: &str) -> Cells {
    pad_right(token, STATUS_WIDTH)
}

fn pad_left(text: &str, width: usize) -> Cells {
    let mut out = Cells::new();
    for _ in text.chars().count()..width {
        let _ = out.push(' ');
    }
    let _ = out.push_str(text);
    out
}

fn pad_right(text: &str, width: usize) -> Cells {
    let mut out = Cells::new();
    let _ = out.push_str(text);
    for _ in text.chars().count()..width {
        let _ = out.push(' ');
    }
    out
}
