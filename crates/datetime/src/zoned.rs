//! Zoned date-time values: parsing, day numbers and canonical strings.

use crate::MILLIS_PER_DAY;
use crate::error::DateTimeError;
use crate::format::format_local;
use crate::zone::{TimeZone, parse_offset};
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Utc,
};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static DATE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(-?\d{4,})-(\d{2})-(\d{2})(?:T(\d{2}):(\d{2})(?::(\d{2})(?:\.(\d+))?)?)?(Z|[+-]\d{2}(?::?\d{2})?)?$",
    )
    .expect("BUG: invalid DATE_TIME_RE regex literal")
});

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2}):(\d{2})(?::(\d{2})(?:\.(\d+))?)?(Z|[+-]\d{2}(?::?\d{2})?)?$")
        .expect("BUG: invalid TIME_RE regex literal")
});

fn epoch() -> NaiveDateTime {
    NaiveDateTime::UNIX_EPOCH
}

/// An instant paired with the zone it is displayed and counted in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZonedDateTime {
    value: DateTime<FixedOffset>,
    zone: TimeZone,
}

impl ZonedDateTime {
    /// Parses `YYYY-MM-DD` or `YYYY-MM-DDThh:mm[:ss[.fff]]`, each optionally
    /// followed by `Z` or a `±hh[:mm]` offset. Without an offset the value
    /// is a wall-clock time in `zone`; with one, the instant is converted
    /// into `zone`.
    pub fn parse(input: &str, zone: TimeZone) -> Result<Self, DateTimeError> {
        let text = input.trim();
        let caps = DATE_TIME_RE
            .captures(text)
            .ok_or_else(|| DateTimeError::Malformed(text.to_string()))?;
        let out_of_range = || DateTimeError::OutOfRange(text.to_string());
        let number = |i: usize| -> Result<u32, DateTimeError> {
            caps.get(i)
                .map_or(Ok(0), |m| m.as_str().parse::<u32>().map_err(|_| out_of_range()))
        };

        let year = caps[1].parse::<i32>().map_err(|_| out_of_range())?;
        let date = NaiveDate::from_ymd_opt(year, number(2)?, number(3)?).ok_or_else(out_of_range)?;
        let millis = caps.get(7).map_or(0, |m| fraction_to_millis(m.as_str()));
        let time = NaiveTime::from_hms_milli_opt(number(4)?, number(5)?, number(6)?, millis)
            .ok_or_else(out_of_range)?;
        let naive = date.and_time(time);

        match caps.get(8) {
            Some(designator) => {
                let offset = parse_offset(designator.as_str())?;
                let utc = naive
                    .checked_sub_signed(TimeDelta::seconds(offset.local_minus_utc().into()))
                    .ok_or_else(out_of_range)?;
                Ok(Self::from_utc(utc, zone))
            }
            None => Ok(Self::from_local(naive, zone)),
        }
    }

    /// Interprets a wall-clock time in `zone`.
    pub fn from_local(local: NaiveDateTime, zone: TimeZone) -> Self {
        let offset = zone.offset_at_local(&local);
        let utc = local - TimeDelta::seconds(offset.local_minus_utc().into());
        Self::from_utc(utc, zone)
    }

    pub fn from_utc(utc: NaiveDateTime, zone: TimeZone) -> Self {
        let offset = zone.offset_at_utc(&utc);
        Self {
            value: DateTime::from_naive_utc_and_offset(utc, offset),
            zone,
        }
    }

    /// The date `days` (possibly fractional) after 1970-01-01T00:00 local.
    pub fn from_days(days: f64, zone: TimeZone) -> Result<Self, DateTimeError> {
        if !days.is_finite() {
            return Err(DateTimeError::NotANumber(days));
        }
        let millis = (days * MILLIS_PER_DAY).round();
        if millis.abs() > 8.64e15 {
            return Err(DateTimeError::NotANumber(days));
        }
        let local = epoch()
            .checked_add_signed(TimeDelta::milliseconds(millis as i64))
            .ok_or(DateTimeError::NotANumber(days))?;
        Ok(Self::from_local(local, zone))
    }

    pub fn now(zone: TimeZone) -> Self {
        Self::from_utc(Utc::now().naive_utc(), zone)
    }

    /// Local midnight at the start of the current day.
    pub fn today(zone: TimeZone) -> Self {
        Self::now(zone).start_of_day()
    }

    /// Local midnight on this value's date.
    pub fn start_of_day(&self) -> Self {
        Self::from_local(self.local().date().and_time(NaiveTime::MIN), self.zone)
    }

    /// Fractional days since 1970-01-01T00:00 in this value's zone.
    pub fn to_days(&self) -> f64 {
        let elapsed = self.local() - epoch();
        elapsed.num_milliseconds() as f64 / MILLIS_PER_DAY
    }

    /// The wall-clock reading in this value's zone.
    pub fn local(&self) -> NaiveDateTime {
        self.value.naive_local()
    }

    pub fn offset(&self) -> FixedOffset {
        *self.value.offset()
    }

    pub fn zone(&self) -> TimeZone {
        self.zone
    }

    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.value
    }

    pub fn is_local_midnight(&self) -> bool {
        self.local().time() == NaiveTime::MIN
    }

    /// Renders `%`-codes against the local reading.
    pub fn format(&self, pattern: &str) -> String {
        format_local(&self.local(), pattern)
    }

    /// `YYYY-MM-DDThh:mm:ss.sss±hh:mm`
    pub fn to_iso_string(&self) -> String {
        let local = self.local();
        format!(
            "{}{}",
            local.format("%Y-%m-%dT%H:%M:%S%.3f"),
            format_offset(self.offset())
        )
    }
}

impl fmt::Display for ZonedDateTime {
    /// The canonical form: the bare date when the local reading is exactly
    /// midnight, the full ISO form otherwise.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local_midnight() {
            write!(f, "{}", self.local().format("%Y-%m-%d"))
        } else {
            write!(f, "{}", self.to_iso_string())
        }
    }
}

/// Parses `hh:mm[:ss[.fff]]` with an optional offset and returns the time of
/// day it denotes in `zone`, as a fraction of a day.
pub fn parse_time_of_day(input: &str, zone: TimeZone) -> Result<f64, DateTimeError> {
    let text = input.trim();
    let caps = TIME_RE
        .captures(text)
        .ok_or_else(|| DateTimeError::Malformed(text.to_string()))?;
    let out_of_range = || DateTimeError::OutOfRange(text.to_string());
    let number = |i: usize| -> Result<u32, DateTimeError> {
        caps.get(i)
            .map_or(Ok(0), |m| m.as_str().parse::<u32>().map_err(|_| out_of_range()))
    };
    let millis = caps.get(4).map_or(0, |m| fraction_to_millis(m.as_str()));
    let time = NaiveTime::from_hms_milli_opt(number(1)?, number(2)?, number(3)?, millis)
        .ok_or_else(out_of_range)?;

    let local_time = match caps.get(5) {
        Some(designator) => {
            let offset = parse_offset(designator.as_str())?;
            let today = ZonedDateTime::today(zone).local().date();
            let utc = today.and_time(time) - TimeDelta::seconds(offset.local_minus_utc().into());
            ZonedDateTime::from_utc(utc, zone).local().time()
        }
        None => time,
    };
    let millis_of_day = f64::from(local_time.num_seconds_from_midnight()) * 1000.0
        + f64::from(local_time.nanosecond() / 1_000_000);
    Ok(millis_of_day / MILLIS_PER_DAY)
}

fn fraction_to_millis(digits: &str) -> u32 {
    let padded: String = digits.chars().chain("000".chars()).take(3).collect();
    padded.parse().unwrap_or(0)
}

fn format_offset(offset: FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.abs() / 60;
    format!("{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
}
