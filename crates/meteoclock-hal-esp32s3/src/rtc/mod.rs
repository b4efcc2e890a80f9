//! DS1302 wiring: bidirectional data line plus the `ClockStore` adapter.

use core::{convert::Infallible, fmt::Debug};

use ds1302::{DataLine, Ds1302, protocol::DateTime};
use embedded_hal::{
    delay::DelayNs,
    digital::{ErrorType, InputPin, OutputPin},
};
use esp_hal::gpio::Flex;
use log::{info, warn};
use meteoclock_core::clock::{ClockStore, Timestamp};

/// Reported until the chip yields a valid reading.
const FALLBACK_TIME: Timestamp = Timestamp::new(2000, 1, 1, 0, 0, 0);

/// DS1302 I/O pin; input stays enabled, output is switched per phase.
pub struct FlexLine<'d> {
    pin: Flex<'d>,
}

impl<'d> FlexLine<'d> {
    pub fn new(mut pin: Flex<'d>) -> Self {
        pin.set_low();
        pin.set_input_enable(true);
        pin.set_output_enable(true);
        Self { pin }
    }
}

impl ErrorType for FlexLine<'_> {
    type Error = Infallible;
}

impl OutputPin for FlexLine<'_> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_low();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.pin.set_high();
        Ok(())
    }
}

impl InputPin for FlexLine<'_> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pin.is_high())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pin.is_low())
    }
}

impl DataLine for FlexLine<'_> {
    fn set_output_mode(&mut self) {
        self.pin.set_output_enable(true);
    }

    fn set_input_mode(&mut self) {
        self.pin.set_output_enable(false);
    }
}

/// Battery-backed clock store on a DS1302.
///
/// Bus or register faults fall back to the last good reading.
pub struct Ds1302Clock<CE, SCLK, IO, D> {
    rtc: Ds1302<CE, SCLK, IO, D>,
    last_good: Timestamp,
    fault_logged: bool,
}

impl<CE, SCLK, IO, D> Ds1302Clock<CE, SCLK, IO, D>
where
    CE: OutputPin,
    SCLK: OutputPin,
    IO: DataLine,
    D: DelayNs,
{
    pub fn new(rtc: Ds1302<CE, SCLK, IO, D>) -> Self {
        Self {
            rtc,
            last_good: FALLBACK_TIME,
            fault_logged: false,
        }
    }

    /// Clears write protect and restarts a halted oscillator.
    pub fn initialize(&mut self) {
        if let Err(err) = self.rtc.initialize() {
            self.note_fault("initialize", err);
            return;
        }

        match self.rtc.is_halted() {
            Ok(false) => {}
            Ok(true) => {
                info!("rtc: oscillator halted, starting at {}", FALLBACK_TIME);
                self.set(FALLBACK_TIME);
            }
            Err(err) => self.note_fault("halt check", err),
        }
    }

    fn note_fault<E: Debug>(&mut self, op: &str, err: E) {
        if self.fault_logged {
            return;
        }
        self.fault_logged = true;
        warn!("rtc: {} failed err={:?}; further faults muted", op, err);
    }
}

impl<CE, SCLK, IO, D> ClockStore for Ds1302Clock<CE, SCLK, IO, D>
where
    CE: OutputPin,
    SCLK: OutputPin,
    IO: DataLine,
    D: DelayNs,
{
    fn now(&mut self) -> Timestamp {
        match self.rtc.read_clock() {
            Ok(raw) => {
                let reading =
                    Timestamp::new(raw.year, raw.month, raw.day, raw.hour, raw.minute, raw.second);
                if reading.is_valid() {
                    self.last_good = reading;
                } else {
                    self.note_fault("read", reading);
                }
            }
            Err(err) => self.note_fault("read", err),
        }
        self.last_good
    }

    fn set(&mut self, timestamp: Timestamp) {
        let raw = DateTime {
            year: timestamp.year,
            month: timestamp.month,
            day: timestamp.day,
            weekday: ds1302::protocol::weekday(timestamp.year, timestamp.month, timestamp.day),
            hour: timestamp.hour,
            minute: timestamp.minute,
            second: timestamp.second,
        };
        match self.rtc.write_clock(&raw) {
            Ok(()) => self.last_good = timestamp,
            Err(err) => self.note_fault("write", err),
        }
    }
}
