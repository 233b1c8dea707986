use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DateTimeError {
    #[error("'{0}' is not a recognised date or date-time")]
    Malformed(String),

    #[error("'{0}' does not name a valid calendar date or time")]
    OutOfRange(String),

    #[error("Time zone offset '{0}' is out of range")]
    InvalidOffset(String),

    #[error("{0} cannot be converted to a date")]
    NotANumber(f64),
}
