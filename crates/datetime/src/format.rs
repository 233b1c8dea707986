//! `%`-code rendering for `format-date` and `format-date-time`.

use chrono::{Datelike, NaiveDateTime, Timelike};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Renders `pattern` against a wall-clock reading.
///
/// | code | output |
/// |---|---|
/// | `%Y` | four digit year |
/// | `%y` | two digit year |
/// | `%m` / `%n` | month, zero padded / bare |
/// | `%b` | short month name |
/// | `%d` / `%e` | day of month, zero padded / bare |
/// | `%a` | short weekday name |
/// | `%H` / `%h` | hour, zero padded / bare |
/// | `%M` | minute |
/// | `%S` | second |
/// | `%3` | millisecond |
/// | `%%` | a literal `%` |
///
/// Unknown codes are copied through unchanged.
pub fn format_local(value: &NaiveDateTime, pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let Some(code) = chars.next() else {
            out.push('%');
            break;
        };
        match code {
            'Y' => out.push_str(&format!("{:04}", value.year())),
            'y' => out.push_str(&format!("{:02}", value.year().rem_euclid(100))),
            'm' => out.push_str(&format!("{:02}", value.month())),
            'n' => out.push_str(&value.month().to_string()),
            'b' => out.push_str(MONTHS[value.month0() as usize]),
            'd' => out.push_str(&format!("{:02}", value.day())),
            'e' => out.push_str(&value.day().to_string()),
            'a' => out.push_str(WEEKDAYS[value.weekday().num_days_from_sunday() as usize]),
            'H' => out.push_str(&format!("{:02}", value.hour())),
            'h' => out.push_str(&value.hour().to_string()),
            'M' => out.push_str(&format!("{:02}", value.minute())),
            'S' => out.push_str(&format!("{:02}", value.second())),
            '3' => out.push_str(&format!("{:03}", value.nanosecond() / 1_000_000 % 1000)),
            '%' => out.push('%'),
            other => {
                out.push('%');
                out.push(other);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32, ms: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_milli_opt(h, min, s, ms))
            .unwrap()
    }

    #[test]
    fn test_date_codes() {
        let value = at(2009, 3, 7, 0, 0, 0, 0);
        assert_eq!(format_local(&value, "%Y-%m-%d"), "2009-03-07");
        assert_eq!(format_local(&value, "%e/%n/%y"), "7/3/09");
        assert_eq!(format_local(&value, "%a, %b %e"), "Sat, Mar 7");
    }

    #[test]
    fn test_time_codes() {
        let value = at(2020, 11, 30, 8, 5, 9, 42);
        assert_eq!(format_local(&value, "%H:%M:%S.%3"), "08:05:09.042");
        assert_eq!(format_local(&value, "%h o'clock"), "8 o'clock");
    }

    #[test]
    fn test_unknown_and_trailing_codes_pass_through() {
        let value = at(2020, 1, 1, 0, 0, 0, 0);
        assert_eq!(format_local(&value, "100%% %q %"), "100% %q %");
        assert_eq!(format_local(&value, "plain"), "plain");
    }
}
