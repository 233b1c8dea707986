//! Date-time coercion for the XForms date functions.
//!
//! Values are anchored to a configured [`TimeZone`]. The numeric form of a
//! date is the number of (fractional) days since 1970-01-01T00:00 local time,
//! which is what XPath arithmetic and comparisons see.

pub mod error;
pub mod format;
pub mod zone;
pub mod zoned;

pub use error::DateTimeError;
pub use format::format_local;
pub use zone::TimeZone;
pub use zoned::{ZonedDateTime, parse_time_of_day};

/// Milliseconds in one day.
pub const MILLIS_PER_DAY: f64 = 86_400_000.0;
