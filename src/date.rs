//! Date/time handling for Amiga format.

use crate::checksum::{read_i32_be, write_i32_be};

/// Seconds between the Unix epoch and 1978-01-01.
const EPOCH_OFFSET: i64 = 2922 * SECONDS_PER_DAY;
const SECONDS_PER_DAY: i64 = 86400;
const TICKS_PER_SECOND: i64 = 50;

/// Amiga date representation.
///
/// Amiga stores dates as days since January 1, 1978,
/// minutes since midnight, and ticks (1/50 second).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AmigaDate {
    /// Days since January 1, 1978.
    pub days: i32,
    /// Minutes since midnight.
    pub mins: i32,
    /// Ticks (1/50 second).
    pub ticks: i32,
}

impl AmigaDate {
    /// Create a new Amiga date from raw values.
    #[inline]
    pub const fn new(days: i32, mins: i32, ticks: i32) -> Self {
        Self { days, mins, ticks }
    }

    /// Build from seconds since 1970-01-01 UTC. Instants before 1978 clamp to the epoch.
    pub const fn from_unix_timestamp(secs: i64) -> Self {
        let since = secs - EPOCH_OFFSET;
        if since <= 0 {
            return Self::new(0, 0, 0);
        }
        let days = since / SECONDS_PER_DAY;
        let rem = since % SECONDS_PER_DAY;
        Self::new(
            days as i32,
            (rem / 60) as i32,
            ((rem % 60) * TICKS_PER_SECOND) as i32,
        )
    }

    /// Current UTC time from the system clock.
    #[cfg(feature = "std")]
    pub fn now() -> Self {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Self::from_unix_timestamp(secs)
    }

    /// Decode the three-longword triple stored at `offset`.
    #[inline]
    pub const fn read(buf: &[u8], offset: usize) -> Self {
        Self::new(
            read_i32_be(buf, offset),
            read_i32_be(buf, offset + 4),
            read_i32_be(buf, offset + 8),
        )
    }

    /// Encode the triple at `offset`.
    #[inline]
    pub fn write(self, buf: &mut [u8], offset: usize) {
        write_i32_be(buf, offset, self.days);
        write_i32_be(buf, offset + 4, self.mins);
        write_i32_be(buf, offset + 8, self.ticks);
    }

    /// Convert to a calendar date and time.
    #[inline]
    pub fn to_date_time(self) -> DateTime {
        let (year, month, day) = days_to_date(self.days);
        DateTime {
            year,
            month,
            day,
            hour: (self.mins / 60) as u8,
            minute: (self.mins % 60) as u8,
            second: (self.ticks / 50) as u8,
        }
    }

    /// Convert to Unix timestamp (seconds since 1970-01-01 00:00:00 UTC).
    #[inline]
    pub const fn to_unix_timestamp(self) -> i64 {
        (self.days as i64) * SECONDS_PER_DAY
            + (self.mins as i64) * 60
            + (self.ticks as i64) / TICKS_PER_SECOND
            + EPOCH_OFFSET
    }
}

/// Timestamp used when the crate has no system clock.
#[cfg(not(feature = "std"))]
pub(crate) fn epoch() -> AmigaDate {
    AmigaDate::default()
}

/// Decoded date and time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateTime {
    /// Year (e.g., 1978-2100).
    pub year: u16,
    /// Month (1-12).
    pub month: u8,
    /// Day of month (1-31).
    pub day: u8,
    /// Hour (0-23).
    pub hour: u8,
    /// Minute (0-59).
    pub minute: u8,
    /// Second (0-59).
    pub second: u8,
}

fn days_to_date(mut days: i32) -> (u16, u8, u8) {
    const DAYS_IN_MONTH: [i32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

    let mut year = 1978u16;
    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if days < days_in_year {
            break;
        }
        days -= days_in_year;
        year += 1;
    }

    let mut month = 1u8;
    let leap = is_leap_year(year);
    for (i, &days_in_month) in DAYS_IN_MONTH.iter().enumerate() {
        let dim = if i == 1 && leap { 29 } else { days_in_month };
        if days < dim {
            break;
        }
        days -= dim;
        month += 1;
    }

    (year, month, (days + 1) as u8)
}

#[inline]
const fn is_leap_year(year: u16) -> bool {
    if year.is_multiple_of(100) {
        year.is_multiple_of(400)
    } else {
        year.is_multiple_of(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch() {
        let dt = AmigaDate::new(0, 0, 0).to_date_time();
        assert_eq!((dt.year, dt.month, dt.day), (1978, 1, 1));
        assert_eq!((dt.hour, dt.minute, dt.second), (0, 0, 0));
    }

    #[test]
    fn test_known_date() {
        // 1997-02-18 is day 6988
        let dt = AmigaDate::new(6988, 0, 0).to_date_time();
        assert_eq!((dt.year, dt.month, dt.day), (1997, 2, 18));
    }

    #[test]
    fn test_from_unix_timestamp() {
        // 2000-01-01 12:30:15 UTC
        let date = AmigaDate::from_unix_timestamp(946_729_815);
        assert_eq!(date, AmigaDate::new(8035, 750, 750));
        assert_eq!(date.to_unix_timestamp(), 946_729_815);
    }

    #[test]
    fn test_before_epoch_clamps() {
        assert_eq!(AmigaDate::from_unix_timestamp(0), AmigaDate::default());
    }

    #[test]
    fn test_read_write_roundtrip_at_offset() {
        let mut buf = [0u8; 32];
        AmigaDate::new(100, 61, 49).write(&mut buf, 4);
        assert_eq!(AmigaDate::read(&buf, 4), AmigaDate::new(100, 61, 49));
    }

    #[test]
    fn test_leap_year() {
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(is_leap_year(1984));
    }
}
