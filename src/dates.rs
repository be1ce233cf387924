//! Recognition and parsing of date strings.
//!
//! Two lexical forms are understood:
//!
//! * an ISO-8601 date-time, `YYYY-MM-DDTHH:MM[:SS[.fff]][Z|±HH:MM]`. When it
//!   carries an offset, the result is a fixed instant; without one it is a
//!   local wall-clock time.
//! * a bare calendar date, `YYYY-MM-DD` or `YYYY-MM`. This is always a local,
//!   timezone-naive date at midnight (the day defaults to the 1st). It is
//!   never read as UTC midnight.

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc,
};
use failure::Fail;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fmt;
use std::str::FromStr;

static DATE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4})-([01]\d)-([0-3]\d)T([0-2]\d):([0-5]\d)(?::([0-5]\d)(?:\.(\d+))?)?(Z|[+-]\d{2}:?\d{2})?$",
    )
    .expect("date-time regex")
});
static CALENDAR_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})(?:-(\d{2}))?$").expect("calendar date regex"));

/// A date parsed out of a JSON string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateValue {
    /// A timezone-naive local date or date-time.
    Local(NaiveDateTime),

    /// A date-time carrying an explicit UTC offset.
    Zoned(DateTime<FixedOffset>),
}

impl DateValue {
    /// The wall-clock date and time in the value's own frame of reference.
    pub fn naive(&self) -> NaiveDateTime {
        match self {
            DateValue::Local(naive) => *naive,
            DateValue::Zoned(dt) => dt.naive_local(),
        }
    }

    /// The absolute instant of this value.
    ///
    /// A local value is placed on the machine's local timezone. Wall-clock
    /// times skipped by a daylight-saving transition fall back to UTC.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            DateValue::Local(naive) => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(naive)),
            DateValue::Zoned(dt) => dt.with_timezone(&Utc),
        }
    }

    /// Whether the value is a local date falling exactly on midnight, as every
    /// bare calendar date does.
    pub fn is_calendar_date(&self) -> bool {
        match self {
            DateValue::Local(naive) => {
                naive.time().num_seconds_from_midnight() == 0 && naive.nanosecond() == 0
            }
            DateValue::Zoned(_) => false,
        }
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::Local(naive) if self.is_calendar_date() => {
                write!(f, "{}", naive.format("%Y-%m-%d"))
            }
            DateValue::Local(naive) => write!(f, "{}", naive.format("%Y-%m-%dT%H:%M:%S%.f")),
            DateValue::Zoned(dt) => f.write_str(&dt.to_rfc3339()),
        }
    }
}

#[derive(Debug, Fail, PartialEq, Clone, Eq)]
#[fail(display = "not a date: {}", _0)]
pub struct DateParseError(pub String);

impl FromStr for DateValue {
    type Err = DateParseError;

    fn from_str(s: &str) -> Result<DateValue, DateParseError> {
        parse_date(s).ok_or_else(|| DateParseError(s.to_owned()))
    }
}

/// Does `s` have the lexical form of a date?
///
/// This is a purely lexical check; `parse_date` may still reject a string
/// which passes it, such as `"2018-13-45"`.
pub fn is_date_string(s: &str) -> bool {
    DATE_TIME_RE.is_match(s) || CALENDAR_DATE_RE.is_match(s)
}

/// Parse a date in either of the supported forms.
///
/// Returns `None` if the string is not lexically a date, or if it names a
/// date or time which does not exist.
pub fn parse_date(s: &str) -> Option<DateValue> {
    if let Some(caps) = DATE_TIME_RE.captures(s) {
        return parse_date_time(&caps);
    }

    let caps = CALENDAR_DATE_RE.captures(s)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = match caps.get(3) {
        Some(day) => day.as_str().parse().ok()?,
        None => 1,
    };

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(DateValue::Local)
}

fn parse_date_time(caps: &Captures<'_>) -> Option<DateValue> {
    let number = |i: usize| -> Option<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    let date = NaiveDate::from_ymd_opt(caps[1].parse().ok()?, number(2)?, number(3)?)?;
    let nanos = match caps.get(7) {
        Some(fraction) => fraction_nanos(fraction.as_str())?,
        None => 0,
    };
    let naive = date.and_hms_nano_opt(number(4)?, number(5)?, number(6)?, nanos)?;

    match caps.get(8) {
        None => Some(DateValue::Local(naive)),
        Some(tz) => {
            let offset = parse_offset(tz.as_str())?;
            offset
                .from_local_datetime(&naive)
                .single()
                .map(DateValue::Zoned)
        }
    }
}

// Fractional seconds beyond nanosecond precision are truncated.
fn fraction_nanos(digits: &str) -> Option<u32> {
    let mut padded: String = digits.chars().take(9).collect();
    while padded.len() < 9 {
        padded.push('0');
    }
    padded.parse().ok()
}

fn parse_offset(tz: &str) -> Option<FixedOffset> {
    if tz == "Z" {
        return FixedOffset::east_opt(0);
    }

    let sign = if tz.starts_with('-') { -1 } else { 1 };
    let digits: String = tz[1..].chars().filter(|c| *c != ':').collect();
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
