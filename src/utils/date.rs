//! Calendar dates and timestamps without timezone dependencies.
//!
//! Two types cover everything the tool needs:
//!
//! - [`Date`]: a calendar day, ordered chronologically. Used as the key of
//!   every backtest series and as the parsed form of CSV date columns.
//! - [`DateTime`]: a front-matter timestamp with an optional UTC offset.
//!
//! # Accepted formats
//!
//! ```text
//! 2024-06-15
//! 2024/06/15                    (Date only)
//! 2024-06-15 14:30:45
//! 2024-06-15T14:30:45Z
//! 2024-06-15T14:30:45.123+08:00
//! ```

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// Date
// ============================================================================

/// A calendar day. Field order makes the derived `Ord` chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl Date {
    pub const fn from_ymd(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// Parse `YYYY-MM-DD` (or `YYYY/MM/DD`).
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.trim().as_bytes();
        if bytes.len() != 10 {
            return None;
        }
        let sep = bytes[4];
        if !matches!(sep, b'-' | b'/') || bytes[7] != sep {
            return None;
        }
        let date = Self::from_ymd(
            parse_u16(&bytes[0..4])?,
            parse_u8(&bytes[5..7])?,
            parse_u8(&bytes[8..10])?,
        );
        date.validate().ok()?;
        Some(date)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=12).contains(&self.month) {
            bail!("month is invalid: {}", self.month);
        }
        let max_days = days_in_month(self.year, self.month);
        if self.day == 0 || self.day > max_days {
            bail!("day is invalid: {}", self.day);
        }
        Ok(())
    }

    /// Days since 1970-01-01 (negative before the epoch).
    pub fn days_since_epoch(&self) -> i64 {
        // Howard Hinnant's days_from_civil
        let (y, m, d) = (
            i64::from(self.year),
            i64::from(self.month),
            i64::from(self.day),
        );
        let y = if m <= 2 { y - 1 } else { y };
        let era = y.div_euclid(400);
        let yoe = y - era * 400;
        let mp = (m + 9) % 12;
        let doy = (153 * mp + 2) / 5 + d - 1;
        let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
        era * 146_097 + doe - 719_468
    }

    /// Number of calendar days from `self` to `other`.
    pub fn days_until(&self, other: Date) -> i64 {
        other.days_since_epoch() - self.days_since_epoch()
    }

    /// Monday-based week number, stable across year boundaries.
    pub fn week_key(&self) -> i64 {
        // 1970-01-01 was a Thursday
        (self.days_since_epoch() + 3).div_euclid(7)
    }

    /// `(year, month)` key for monthly grouping.
    pub const fn month_key(&self) -> (u16, u8) {
        (self.year, self.month)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for Date {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match Self::parse(s) {
            Some(date) => Ok(date),
            None => bail!("invalid date `{s}`, expected YYYY-MM-DD"),
        }
    }
}

impl Serialize for Date {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        // Exported data often carries a midnight time part
        let parsed = Self::parse(&s).or_else(|| DateTime::parse(&s).map(|dt| dt.date));
        parsed.ok_or_else(|| {
            serde::de::Error::custom(format!("invalid date `{s}`, expected YYYY-MM-DD"))
        })
    }
}

// ============================================================================
// DateTime
// ============================================================================

/// Timestamp as written in front matter. `offset_minutes` is `None` for
/// local (unqualified) times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub date: Date,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub offset_minutes: Option<i16>,
}

impl DateTime {
    pub const fn new(date: Date, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            date,
            hour,
            minute,
            second,
            offset_minutes: None,
        }
    }

    /// Parse a date or timestamp in any of the accepted formats.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let bytes = s.as_bytes();

        if bytes.len() < 10 {
            return None;
        }
        let date = Date::parse(s.get(0..10)?)?;
        if bytes.len() == 10 {
            return Some(Self::new(date, 0, 0, 0));
        }

        // Time part: [T ]HH:MM:SS
        if !matches!(bytes[10], b'T' | b't' | b' ') || bytes.len() < 19 {
            return None;
        }
        if bytes[13] != b':' || bytes[16] != b':' {
            return None;
        }
        let mut dt = Self::new(
            date,
            parse_u8(&bytes[11..13])?,
            parse_u8(&bytes[14..16])?,
            parse_u8(&bytes[17..19])?,
        );

        // Optional fractional seconds
        let mut rest = &bytes[19..];
        if let Some((&b'.', tail)) = rest.split_first() {
            let digits = tail.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits == 0 {
                return None;
            }
            rest = &tail[digits..];
        }

        // Optional offset
        dt.offset_minutes = match rest {
            [] => None,
            [b'Z' | b'z'] => Some(0),
            [sign @ (b'+' | b'-'), h1, h2, b':', m1, m2] => {
                let hours = i16::from(parse_u8(&[*h1, *h2])?);
                let minutes = i16::from(parse_u8(&[*m1, *m2])?);
                if hours > 23 || minutes > 59 {
                    return None;
                }
                let total = hours * 60 + minutes;
                Some(if *sign == b'-' { -total } else { total })
            }
            _ => return None,
        };

        dt.validate().ok()?;
        Some(dt)
    }

    pub fn validate(&self) -> Result<()> {
        self.date.validate()?;
        if self.hour > 23 {
            bail!("hour is invalid: {}", self.hour);
        }
        if self.minute > 59 {
            bail!("minute is invalid: {}", self.minute);
        }
        if self.second > 59 {
            bail!("second is invalid: {}", self.second);
        }
        Ok(())
    }

    /// Seconds since the epoch, treating unqualified times as UTC.
    pub fn timestamp(&self) -> i64 {
        let offset = i64::from(self.offset_minutes.unwrap_or(0)) * 60;
        self.date.days_since_epoch() * 86_400
            + i64::from(self.hour) * 3600
            + i64::from(self.minute) * 60
            + i64::from(self.second)
            - offset
    }

    /// Format as RFC 3339.
    pub fn to_rfc3339(self) -> String {
        let offset = match self.offset_minutes {
            None | Some(0) => "Z".to_string(),
            Some(m) => {
                let sign = if m < 0 { '-' } else { '+' };
                let m = m.unsigned_abs();
                format!("{sign}{:02}:{:02}", m / 60, m % 60)
            }
        };
        format!(
            "{}T{:02}:{:02}:{:02}{offset}",
            self.date, self.hour, self.minute, self.second
        )
    }
}

// ============================================================================
// Helpers
// ============================================================================

#[inline]
#[allow(clippy::manual_is_multiple_of)]
const fn is_leap_year(year: u16) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

#[inline]
const fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Parse 2-digit ASCII number
#[inline]
fn parse_u8(bytes: &[u8]) -> Option<u8> {
    if bytes.len() != 2 {
        return None;
    }
    let d1 = bytes[0].wrapping_sub(b'0');
    let d2 = bytes[1].wrapping_sub(b'0');
    if d1 > 9 || d2 > 9 {
        return None;
    }
    Some(d1 * 10 + d2)
}

/// Parse 4-digit ASCII number
#[inline]
fn parse_u16(bytes: &[u8]) -> Option<u16> {
    if bytes.len() != 4 {
        return None;
    }
    let mut result = 0u16;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        result = result * 10 + u16::from(d);
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_parse() {
        assert_eq!(Date::parse("2024-06-15"), Some(Date::from_ymd(2024, 6, 15)));
        assert_eq!(Date::parse("2024/06/15"), Some(Date::from_ymd(2024, 6, 15)));
        assert_eq!(Date::parse("2024-06/15"), None);
        assert_eq!(Date::parse("2024-6-15"), None);
        assert_eq!(Date::parse("2023-02-29"), None);
        assert_eq!(Date::parse("2024-02-29"), Some(Date::from_ymd(2024, 2, 29)));
    }

    #[test]
    fn test_date_ordering() {
        let a = Date::from_ymd(2023, 12, 31);
        let b = Date::from_ymd(2024, 1, 1);
        let c = Date::from_ymd(2024, 1, 2);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_days_since_epoch() {
        assert_eq!(Date::from_ymd(1970, 1, 1).days_since_epoch(), 0);
        assert_eq!(Date::from_ymd(1970, 1, 2).days_since_epoch(), 1);
        assert_eq!(Date::from_ymd(1969, 12, 31).days_since_epoch(), -1);
        assert_eq!(Date::from_ymd(2000, 3, 1).days_since_epoch(), 11_017);
        assert_eq!(
            Date::from_ymd(2024, 1, 1).days_until(Date::from_ymd(2025, 1, 1)),
            366
        );
    }

    #[test]
    fn test_week_key_monday_boundary() {
        // 2024-06-09 is a Sunday, 2024-06-10 a Monday
        let sunday = Date::from_ymd(2024, 6, 9);
        let monday = Date::from_ymd(2024, 6, 10);
        let tuesday = Date::from_ymd(2024, 6, 11);
        assert_ne!(sunday.week_key(), monday.week_key());
        assert_eq!(monday.week_key(), tuesday.week_key());
    }

    #[test]
    fn test_date_serde_roundtrip() {
        let date = Date::from_ymd(2021, 3, 4);
        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(json, "\"2021-03-04\"");
        let back: Date = serde_json::from_str(&json).unwrap();
        assert_eq!(back, date);
        assert!(serde_json::from_str::<Date>("\"2021-13-04\"").is_err());
    }

    #[test]
    fn test_datetime_parse_formats() {
        let dt = DateTime::parse("2024-06-15").unwrap();
        assert_eq!(dt.hour, 0);
        assert_eq!(dt.offset_minutes, None);

        let dt = DateTime::parse("2024-06-15 14:30:45").unwrap();
        assert_eq!((dt.hour, dt.minute, dt.second), (14, 30, 45));

        let dt = DateTime::parse("2024-06-15T14:30:45Z").unwrap();
        assert_eq!(dt.offset_minutes, Some(0));

        let dt = DateTime::parse("2020-05-01T10:00:00+08:00").unwrap();
        assert_eq!(dt.offset_minutes, Some(480));

        let dt = DateTime::parse("2020-05-01T10:00:00.123-05:30").unwrap();
        assert_eq!(dt.offset_minutes, Some(-330));
    }

    #[test]
    fn test_datetime_parse_invalid() {
        assert!(DateTime::parse("yesterday").is_none());
        assert!(DateTime::parse("2024-06-15T25:00:00Z").is_none());
        assert!(DateTime::parse("2024-06-15T10:00:00+0800").is_none());
        assert!(DateTime::parse("2024-06-15T10:00:00.Z").is_none());
        assert!(DateTime::parse("2024-06-31").is_none());
    }

    #[test]
    fn test_timestamp_respects_offset() {
        let utc = DateTime::parse("2020-05-01T02:00:00Z").unwrap();
        let east = DateTime::parse("2020-05-01T10:00:00+08:00").unwrap();
        assert_eq!(utc.timestamp(), east.timestamp());
    }

    #[test]
    fn test_to_rfc3339() {
        let dt = DateTime::parse("2020-05-01T10:00:00+08:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2020-05-01T10:00:00+08:00");
        let dt = DateTime::parse("2020-05-01").unwrap();
        assert_eq!(dt.to_rfc3339(), "2020-05-01T00:00:00Z");
    }
}
