#![cfg_attr(not(test), no_std)]

//! DS1302 trickle-charge timekeeper over its 3-wire serial interface.

pub mod protocol;

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

use protocol::{BURST_LEN, DateTime, ProtocolError};

// tCC and tCWH are 4 us at 2 V; 1 us covers tCL/tCH/tDC.
const CE_SETUP_US: u32 = 4;
const BIT_US: u32 = 1;

/// The shared I/O line, switched between driving and listening.
pub trait DataLine: InputPin + OutputPin {
    fn set_output_mode(&mut self);
    fn set_input_mode(&mut self);
}

/// Driver errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error<CeErr, SclkErr, IoErr> {
    Ce(CeErr),
    Sclk(SclkErr),
    Io(IoErr),
    Protocol(ProtocolError),
}

pub type Ds1302Result<CE, SCLK, IO, T> = Result<
    T,
    Error<
        <CE as embedded_hal::digital::ErrorType>::Error,
        <SCLK as embedded_hal::digital::ErrorType>::Error,
        <IO as embedded_hal::digital::ErrorType>::Error,
    >,
>;

/// Bit-banged DS1302 driver.
#[derive(Debug)]
pub struct Ds1302<CE, SCLK, IO, D> {
    ce: CE,
    sclk: SCLK,
    io: IO,
    delay: D,
}

impl<CE, SCLK, IO, D> Ds1302<CE, SCLK, IO, D>
where
    CE: OutputPin,
    SCLK: OutputPin,
    IO: DataLine,
    D: DelayNs,
{
    pub fn new(ce: CE, sclk: SCLK, io: IO, delay: D) -> Self {
        Self {
            ce,
            sclk,
            io,
            delay,
        }
    }

    pub fn release(self) -> (CE, SCLK, IO, D) {
        (self.ce, self.sclk, self.io, self.delay)
    }

    /// Idles the bus and clears write protect so later writes land.
    pub fn initialize(&mut self) -> Ds1302Result<CE, SCLK, IO, ()> {
        self.ce.set_low().map_err(Error::Ce)?;
        self.sclk.set_low().map_err(Error::Sclk)?;
        self.set_write_protect(false)
    }

    /// Whether the oscillator is stopped (fresh chip or lost backup power).
    pub fn is_halted(&mut self) -> Ds1302Result<CE, SCLK, IO, bool> {
        let mut seconds = [0u8; 1];
        self.transfer_in(protocol::CMD_SECONDS_READ, &mut seconds)?;
        Ok(seconds[0] & protocol::SECONDS_CLOCK_HALT != 0)
    }

    pub fn read_clock(&mut self) -> Ds1302Result<CE, SCLK, IO, DateTime> {
        let mut raw = [0u8; BURST_LEN];
        self.transfer_in(protocol::CMD_CLOCK_BURST_READ, &mut raw)?;
        protocol::decode_clock_burst(&raw).map_err(Error::Protocol)
    }

    /// Writes all clock registers at once; also starts the oscillator.
    pub fn write_clock(&mut self, time: &DateTime) -> Ds1302Result<CE, SCLK, IO, ()> {
        let raw = protocol::encode_clock_burst(time).map_err(Error::Protocol)?;
        self.set_write_protect(false)?;
        self.transfer_out(protocol::CMD_CLOCK_BURST_WRITE, &raw)
    }

    fn set_write_protect(&mut self, enabled: bool) -> Ds1302Result<CE, SCLK, IO, ()> {
        let control = if enabled {
            protocol::CONTROL_WRITE_PROTECT
        } else {
            0x00
        };
        self.write_register(protocol::CMD_CONTROL_WRITE, control)
    }

    fn write_register(&mut self, command: u8, value: u8) -> Ds1302Result<CE, SCLK, IO, ()> {
        self.transfer_out(command, &[value])
    }

    fn transfer_out(&mut self, command: u8, bytes: &[u8]) -> Ds1302Result<CE, SCLK, IO, ()> {
        self.begin()?;
        let result = self.write_byte(command).and_then(|()| {
            bytes
                .iter()
                .try_for_each(|byte| self.write_byte(*byte))
        });
        self.end()?;
        result
    }

    fn transfer_in(&mut self, command: u8, out: &mut [u8]) -> Ds1302Result<CE, SCLK, IO, ()> {
        self.begin()?;
        let mut result = self.write_byte(command);
        if result.is_ok() {
            // The chip drives the first data bit on the last command falling edge.
            self.io.set_input_mode();
            for slot in out.iter_mut() {
                match self.read_byte() {
                    Ok(byte) => *slot = byte,
                    Err(err) => {
                        result = Err(err);
                        break;
                    }
                }
            }
        }
        self.end()?;
        result
    }

    fn begin(&mut self) -> Ds1302Result<CE, SCLK, IO, ()> {
        self.sclk.set_low().map_err(Error::Sclk)?;
        self.io.set_output_mode();
        self.ce.set_high().map_err(Error::Ce)?;
        self.delay.delay_us(CE_SETUP_US);
        Ok(())
    }

    fn end(&mut self) -> Ds1302Result<CE, SCLK, IO, ()> {
        self.ce.set_low().map_err(Error::Ce)?;
        self.io.set_output_mode();
        self.delay.delay_us(CE_SETUP_US);
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Ds1302Result<CE, SCLK, IO, ()> {
        for bit in 0..8 {
            if byte & (1 << bit) != 0 {
                self.io.set_high().map_err(Error::Io)?;
            } else {
                self.io.set_low().map_err(Error::Io)?;
            }
            self.delay.delay_us(BIT_US);
            self.sclk.set_high().map_err(Error::Sclk)?;
            self.delay.delay_us(BIT_US);
            self.sclk.set_low().map_err(Error::Sclk)?;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Ds1302Result<CE, SCLK, IO, u8> {
        let mut byte = 0u8;
        for bit in 0..8 {
            if self.io.is_high().map_err(Error::Io)? {
                byte |= 1 << bit;
            }
            self.sclk.set_high().map_err(Error::Sclk)?;
            self.delay.delay_us(BIT_US);
            self.sclk.set_low().map_err(Error::Sclk)?;
            self.delay.delay_us(BIT_US);
        }
        Ok(byte)
    }
}

#[cfg(test)]
mod tests {
    use core::{cell::RefCell, convert::Infallible};
    use std::{collections::VecDeque, rc::Rc};

    use embedded_hal::digital::ErrorType;

    use super::*;

    /// Shared wire state: IO level, CE, the bits latched on SCLK rising
    /// edges while IO drives, and bits the fake chip shifts out.
    #[derive(Default)]
    struct Wire {
        ce: bool,
        io_level: bool,
        io_output: bool,
        latched: Vec<bool>,
        chip_bits: VecDeque<bool>,
    }

    type Shared = Rc<RefCell<Wire>>;

    struct Ce(Shared);
    struct Sclk(Shared);
    struct Io(Shared);
    struct NoDelay;

    impl ErrorType for Ce {
        type Error = Infallible;
    }
    impl ErrorType for Sclk {
        type Error = Infallible;
    }
    impl ErrorType for Io {
        type Error = Infallible;
    }

    impl OutputPin for Ce {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().ce = false;
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().ce = true;
            Ok(())
        }
    }

    impl OutputPin for Sclk {
        fn set_low(&mut self) -> Result<(), Infallible> {
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            let mut wire = self.0.borrow_mut();
            assert!(wire.ce, "clock pulse outside a transfer");
            if wire.io_output {
                let level = wire.io_level;
                wire.latched.push(level);
            } else {
                wire.chip_bits.pop_front();
            }
            Ok(())
        }
    }

    impl OutputPin for Io {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().io_level = false;
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().io_level = true;
            Ok(())
        }
    }

    impl InputPin for Io {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.0.borrow().chip_bits.front().copied().unwrap_or(false))
        }
        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|high| !high)
        }
    }

    impl DataLine for Io {
        fn set_output_mode(&mut self) {
            self.0.borrow_mut().io_output = true;
        }
        fn set_input_mode(&mut self) {
            self.0.borrow_mut().io_output = false;
        }
    }

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn driver() -> (Ds1302<Ce, Sclk, Io, NoDelay>, Shared) {
        let wire = Shared::default();
        let rtc = Ds1302::new(
            Ce(wire.clone()),
            Sclk(wire.clone()),
            Io(wire.clone()),
            NoDelay,
        );
        (rtc, wire)
    }

    fn latched_bytes(wire: &Shared) -> Vec<u8> {
        wire.borrow()
            .latched
            .chunks(8)
            .map(|bits| {
                bits.iter()
                    .enumerate()
                    .fold(0u8, |byte, (bit, high)| byte | ((*high as u8) << bit))
            })
            .collect()
    }

    #[test]
    fn write_clock_clears_protect_then_bursts_lsb_first() {
        let (mut rtc, wire) = driver();
        let time = DateTime {
            year: 2024,
            month: 1,
            day: 15,
            weekday: 1,
            hour: 12,
            minute: 34,
            second: 56,
        };

        rtc.write_clock(&time).unwrap();

        assert_eq!(
            latched_bytes(&wire),
            vec![0x8E, 0x00, 0xBE, 0x56, 0x34, 0x12, 0x15, 0x01, 0x01, 0x24, 0x00]
        );
        assert!(!wire.borrow().ce);
    }

    #[test]
    fn read_clock_shifts_in_burst() {
        let (mut rtc, wire) = driver();
        let raw = [0x07u8, 0x05, 0x21, 0x28, 0x02, 0x03, 0x25, 0x80];
        wire.borrow_mut().chip_bits = raw
            .iter()
            .flat_map(|byte| (0..8).map(move |bit| byte & (1 << bit) != 0))
            .collect();

        let time = rtc.read_clock().unwrap();
        assert_eq!((time.year, time.month, time.day), (2025, 2, 28));
        assert_eq!((time.hour, time.minute, time.second), (21, 5, 7));
        assert_eq!(latched_bytes(&wire), vec![0xBF]);
    }

    #[test]
    fn halted_flag_comes_from_seconds_register() {
        let (mut rtc, wire) = driver();
        wire.borrow_mut().chip_bits = (0..8).map(|bit| 0x80u8 & (1 << bit) != 0).collect();
        assert_eq!(rtc.is_halted(), Ok(true));
    }

    #[test]
    fn out_of_range_year_is_not_sent() {
        let (mut rtc, wire) = driver();
        let time = DateTime {
            year: 1999,
            month: 1,
            day: 1,
            weekday: 5,
            hour: 0,
            minute: 0,
            second: 0,
        };
        assert_eq!(
            rtc.write_clock(&time),
            Err(Error::Protocol(ProtocolError::YearOutOfRange))
        );
        assert!(wire.borrow().latched.is_empty());
    }
}
