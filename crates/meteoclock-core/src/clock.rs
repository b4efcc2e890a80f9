//! Civil time, the RTC seam and monotonic ticks.

use core::fmt;

const SECONDS_PER_DAY: i64 = 86_400;
// Days from 0000-03-01 to 1970-01-01 in the proleptic Gregorian calendar.
const EPOCH_SHIFT_DAYS: i64 = 719_468;
const DAYS_PER_ERA: i64 = 146_097;

/// Local civil date-time, second resolution.
///
/// Field order makes the derived ordering chronological.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Timestamp {
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Converts Unix seconds to civil time shifted by a fixed zone offset.
    pub fn from_unix(unix_secs: u64, offset_secs: i32) -> Self {
        let local = unix_secs as i64 + offset_secs as i64;
        let days = local.div_euclid(SECONDS_PER_DAY);
        let secs_of_day = local.rem_euclid(SECONDS_PER_DAY);
        let (year, month, day) = civil_from_days(days);

        Self {
            year: year.clamp(0, u16::MAX as i64) as u16,
            month,
            day,
            hour: (secs_of_day / 3_600) as u8,
            minute: ((secs_of_day % 3_600) / 60) as u8,
            second: (secs_of_day % 60) as u8,
        }
    }

    /// Seconds since the Unix epoch of this civil time read in a zone with
    /// `offset_secs`.
    pub fn to_unix(&self, offset_secs: i32) -> i64 {
        let days = days_from_civil(self.year as i64, self.month, self.day);
        days * SECONDS_PER_DAY
            + self.hour as i64 * 3_600
            + self.minute as i64 * 60
            + self.second as i64
            - offset_secs as i64
    }

    pub fn is_valid(&self) -> bool {
        (1..=12).contains(&self.month)
            && self.day >= 1
            && self.day <= days_in_month(self.year, self.month)
            && self.hour < 24
            && self.minute < 60
            && self.second < 60
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

pub const fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub const fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days + EPOCH_SHIFT_DAYS;
    let era = z.div_euclid(DAYS_PER_ERA);
    let doe = z.rem_euclid(DAYS_PER_ERA);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

fn days_from_civil(year: i64, month: u8, day: u8) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let yoe = year.rem_euclid(400);
    let month = month as i64;
    let shifted_month = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * shifted_month + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * DAYS_PER_ERA + doe - EPOCH_SHIFT_DAYS
}

/// Battery-backed date/time storage.
pub trait ClockStore {
    fn now(&mut self) -> Timestamp;
    fn set(&mut self, timestamp: Timestamp);
}

impl<T: ClockStore + ?Sized> ClockStore for &mut T {
    fn now(&mut self) -> Timestamp {
        (**self).now()
    }

    fn set(&mut self, timestamp: Timestamp) {
        (**self).set(timestamp)
    }
}

/// Monotonic millisecond ticks plus a cooperative sleep.
#[allow(async_fn_in_trait)]
pub trait Monotonic {
    fn now_ms(&self) -> u64;
    async fn sleep_ms(&self, ms: u64);
}

impl<T: Monotonic + ?Sized> Monotonic for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }

    async fn sleep_ms(&self, ms: u64) {
        (**self).sleep_ms(ms).await
    }
}

/// Window timer: fires once `now - last > interval`, then restarts at `now`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IntervalTimer {
    interval_ms: u64,
    last_ms: u64,
}

impl IntervalTimer {
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_ms: 0,
        }
    }

    pub const fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub const fn last_ms(&self) -> u64 {
        self.last_ms
    }

    pub const fn elapsed(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_ms) > self.interval_ms
    }

    pub fn reset(&mut self, now_ms: u64) {
        self.last_ms = now_ms;
    }

    /// Returns `true` and restarts the window when elapsed.
    pub fn fire(&mut self, now_ms: u64) -> bool {
        if !self.elapsed(now_ms) {
            return false;
        }
        self.reset(now_ms);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_to_civil_applies_zone_offset() {
        // 2023-11-14 22:13:20 UTC
        let utc = Timestamp::from_unix(1_700_000_000, 0);
        assert_eq!(utc, Timestamp::new(2023, 11, 14, 22, 13, 20));

        let omsk = Timestamp::from_unix(1_700_000_000, 6 * 3_600);
        assert_eq!(omsk, Timestamp::new(2023, 11, 15, 4, 13, 20));
    }

    #[test]
    fn leap_day_and_year_end_convert() {
        assert_eq!(
            Timestamp::from_unix(951_782_400, 0),
            Timestamp::new(2000, 2, 29, 0, 0, 0)
        );
        assert_eq!(
            Timestamp::from_unix(1_704_067_199, 0),
            Timestamp::new(2023, 12, 31, 23, 59, 59)
        );
    }

    #[test]
    fn civil_round_trips_through_unix() {
        let stamp = Timestamp::new(2031, 7, 9, 18, 5, 42);
        let unix = stamp.to_unix(3 * 3_600);
        assert_eq!(Timestamp::from_unix(unix as u64, 3 * 3_600), stamp);
    }

    #[test]
    fn ordering_is_chronological() {
        let earlier = Timestamp::new(2024, 12, 31, 23, 59, 59);
        let later = Timestamp::new(2025, 1, 1, 0, 0, 0);
        assert!(earlier < later);
    }

    #[test]
    fn validity_checks_month_lengths() {
        assert!(Timestamp::new(2024, 2, 29, 0, 0, 0).is_valid());
        assert!(!Timestamp::new(2023, 2, 29, 0, 0, 0).is_valid());
        assert!(!Timestamp::new(2023, 13, 1, 0, 0, 0).is_valid());
    }

    #[test]
    fn interval_timer_fires_strictly_after_interval_and_resets_window() {
        let mut timer = IntervalTimer::new(300);
        assert!(!timer.fire(300));
        assert!(timer.fire(301));
        assert_eq!(timer.last_ms(), 301);
        assert!(!timer.fire(601));
        assert!(timer.fire(602));
    }
}
