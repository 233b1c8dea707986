//! The time zone date values are anchored to.

use crate::error::DateTimeError;
use chrono::{FixedOffset, Local, LocalResult, NaiveDateTime, Offset, TimeZone as _, Utc};

/// The zone all date functions of one evaluation interpret local times in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeZone {
    Utc,
    /// The host system's zone, including its daylight-saving rules.
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl TimeZone {
    /// A fixed zone `seconds` east of UTC. `None` if a day or more away.
    pub fn fixed(seconds: i32) -> Option<Self> {
        FixedOffset::east_opt(seconds).map(TimeZone::Fixed)
    }

    /// Parses an offset designator such as `Z`, `+05:30`, `-0800` or `+02`.
    pub fn parse_offset(text: &str) -> Result<Self, DateTimeError> {
        parse_offset(text).map(TimeZone::Fixed)
    }

    /// The offset in effect at the given UTC instant.
    pub fn offset_at_utc(&self, utc: &NaiveDateTime) -> FixedOffset {
        match self {
            TimeZone::Utc => Utc.fix(),
            TimeZone::Local => Local.offset_from_utc_datetime(utc).fix(),
            TimeZone::Fixed(offset) => *offset,
        }
    }

    /// The offset in effect at the given wall-clock time. Ambiguous times
    /// take the earlier offset; times skipped by a transition take the
    /// offset in effect at the same UTC reading.
    pub fn offset_at_local(&self, local: &NaiveDateTime) -> FixedOffset {
        match self {
            TimeZone::Utc => Utc.fix(),
            TimeZone::Local => match Local.offset_from_local_datetime(local) {
                LocalResult::Single(offset) => offset.fix(),
                LocalResult::Ambiguous(earlier, _) => earlier.fix(),
                LocalResult::None => Local.offset_from_utc_datetime(local).fix(),
            },
            TimeZone::Fixed(offset) => *offset,
        }
    }
}

pub(crate) fn parse_offset(text: &str) -> Result<FixedOffset, DateTimeError> {
    let invalid = || DateTimeError::InvalidOffset(text.to_string());
    if text == "Z" {
        return Ok(Utc.fix());
    }
    let (sign, digits) = match text.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(invalid()),
    };
    let digits = digits.replace(':', "");
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().map_err(|_| invalid())?, 0),
        4 => (
            digits[..2].parse::<i32>().map_err(|_| invalid())?,
            digits[2..].parse::<i32>().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };
    if hours >= 24 || minutes >= 60 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
