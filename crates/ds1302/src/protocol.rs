//! DS1302 command bytes and the clock-burst register image.
//!
//! Burst order: seconds, minutes, hours, date, month, weekday, year, control.
//! Every field is packed BCD; bytes travel LSB first.

pub const CMD_CLOCK_BURST_WRITE: u8 = 0xBE;
pub const CMD_CLOCK_BURST_READ: u8 = 0xBF;
pub const CMD_CONTROL_WRITE: u8 = 0x8E;
pub const CMD_SECONDS_READ: u8 = 0x81;

pub const BURST_LEN: usize = 8;

/// Clock halt flag in the seconds register.
pub const SECONDS_CLOCK_HALT: u8 = 0x80;
/// 12-hour mode flag in the hours register.
pub const HOURS_12H_MODE: u8 = 0x80;
const HOURS_PM: u8 = 0x20;
/// Write-protect flag in the control register.
pub const CONTROL_WRITE_PROTECT: u8 = 0x80;

pub const BASE_YEAR: u16 = 2000;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProtocolError {
    /// A register held a non-BCD nibble or an out-of-range field.
    InvalidRegister,
    /// Year outside 2000..=2099.
    YearOutOfRange,
}

/// Calendar fields as the chip stores them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    /// 1..=7, user-defined origin.
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

pub const fn bcd_encode(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

pub fn bcd_decode(raw: u8) -> Result<u8, ProtocolError> {
    let tens = raw >> 4;
    let ones = raw & 0x0F;
    if tens > 9 || ones > 9 {
        return Err(ProtocolError::InvalidRegister);
    }
    Ok(tens * 10 + ones)
}

fn field(raw: u8, min: u8, max: u8) -> Result<u8, ProtocolError> {
    let value = bcd_decode(raw)?;
    if value < min || value > max {
        return Err(ProtocolError::InvalidRegister);
    }
    Ok(value)
}

fn decode_hours(raw: u8) -> Result<u8, ProtocolError> {
    if raw & HOURS_12H_MODE == 0 {
        return field(raw & 0x3F, 0, 23);
    }

    let hour12 = field(raw & 0x1F, 1, 12)?;
    let pm = raw & HOURS_PM != 0;
    Ok(match (hour12, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (hour, false) => hour,
        (hour, true) => hour + 12,
    })
}

/// Decodes a burst read. The clock halt flag is ignored.
pub fn decode_clock_burst(raw: &[u8; BURST_LEN]) -> Result<DateTime, ProtocolError> {
    Ok(DateTime {
        second: field(raw[0] & !SECONDS_CLOCK_HALT, 0, 59)?,
        minute: field(raw[1] & 0x7F, 0, 59)?,
        hour: decode_hours(raw[2])?,
        day: field(raw[3] & 0x3F, 1, 31)?,
        month: field(raw[4] & 0x1F, 1, 12)?,
        weekday: field(raw[5] & 0x07, 1, 7)?,
        year: BASE_YEAR + field(raw[6], 0, 99)? as u16,
    })
}

/// Builds a burst write: clock running, 24-hour mode, write protect off.
pub fn encode_clock_burst(time: &DateTime) -> Result<[u8; BURST_LEN], ProtocolError> {
    if !(BASE_YEAR..BASE_YEAR + 100).contains(&time.year) {
        return Err(ProtocolError::YearOutOfRange);
    }

    Ok([
        bcd_encode(time.second),
        bcd_encode(time.minute),
        bcd_encode(time.hour),
        bcd_encode(time.day),
        bcd_encode(time.month),
        bcd_encode(time.weekday),
        bcd_encode((time.year - BASE_YEAR) as u8),
        0x00,
    ])
}

/// ISO weekday (Monday = 1) via Sakamoto's method.
pub fn weekday(year: u16, month: u8, day: u8) -> u8 {
    const OFFSETS: [u16; 12] = [0, 3, 2, 5, 0, 3, 5, 1, 4, 6, 2, 4];
    let y = if month < 3 { year - 1 } else { year };
    let sunday_based =
        (y + y / 4 - y / 100 + y / 400 + OFFSETS[(month.clamp(1, 12) - 1) as usize] + day as u16) % 7;
    if sunday_based == 0 { 7 } else { sunday_based as u8 }
}
