//! XForms date and time functions.
//!
//! Parse failures never surface as errors: each function degrades to its
//! sentinel (`''` or `NaN`) and logs a warning.

use super::{FunctionCall, FunctionLibrary, Parameter, Signature, TypeHint};
use crate::error::XPathError;
use crate::tree::TreeNode;
use crate::value::{Evaluation, string_to_number};
use log::warn;
use xforms_xpath_datetime::{DateTimeError, ZonedDateTime, parse_time_of_day};

type Output<'a, N> = Result<Evaluation<'a, N>, XPathError>;

pub fn register<'a, N: TreeNode<'a>>(lib: &mut FunctionLibrary<'a, N>) {
    let any = || Parameter::required(TypeHint::Any);
    let pattern = || Parameter::required(TypeHint::String);

    lib.register("today", Signature::default(), today);
    lib.register("now", Signature::default(), now);
    lib.register("date", Signature::new(vec![any()]), date);
    lib.register("date-time", Signature::new(vec![any()]), date_time);
    lib.register("decimal-date-time", Signature::new(vec![any()]), decimal_date_time);
    lib.register("decimal-time", Signature::new(vec![any()]), decimal_time);
    lib.register("format-date", Signature::new(vec![any(), pattern()]), format_date);
    lib.register(
        "format-date-time",
        Signature::new(vec![any(), pattern()]),
        format_date_time,
    );
}

/// Reads a value as a date-time: numbers (and numeric strings) are day
/// counts, dates pass through, anything else is parsed as ISO text.
fn to_date_time<'a, N: TreeNode<'a>>(
    call: &FunctionCall<'_, 'a, '_, N>,
    value: &Evaluation<'a, N>,
) -> Result<ZonedDateTime, DateTimeError> {
    let zone = call.e_ctx.time_zone;
    match value {
        Evaluation::Date(date) => Ok(*date),
        Evaluation::Number(days) => ZonedDateTime::from_days(*days, zone),
        Evaluation::Boolean(_) => Err(DateTimeError::Malformed(value.to_string())),
        _ => {
            let text = value.to_string();
            ZonedDateTime::parse(&text, zone).or_else(|err| {
                let days = string_to_number(&text);
                if days.is_nan() {
                    Err(err)
                } else {
                    ZonedDateTime::from_days(days, zone)
                }
            })
        }
    }
}

fn degrade<'a, N: TreeNode<'a>>(
    call: &FunctionCall<'_, 'a, '_, N>,
    err: DateTimeError,
    sentinel: Evaluation<'a, N>,
) -> Output<'a, N> {
    warn!("{}() returned '{}': {}", call.name, sentinel, err);
    Ok(sentinel)
}

fn today<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Date(ZonedDateTime::today(call.e_ctx.time_zone)))
}

fn now<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Date(ZonedDateTime::now(call.e_ctx.time_zone)))
}

/// The value's date at local midnight.
fn date<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let value = call.arg(0)?;
    match to_date_time(call, &value) {
        Ok(date) => Ok(Evaluation::Date(date.start_of_day())),
        Err(err) => degrade(call, err, Evaluation::String(String::new())),
    }
}

fn date_time<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let value = call.arg(0)?;
    match to_date_time(call, &value) {
        Ok(date) => Ok(Evaluation::Date(date)),
        Err(err) => degrade(call, err, Evaluation::String(String::new())),
    }
}

fn decimal_date_time<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let value = call.arg(0)?;
    match to_date_time(call, &value) {
        Ok(date) => Ok(Evaluation::Number(date.to_days())),
        Err(err) => degrade(call, err, Evaluation::Number(f64::NAN)),
    }
}

/// The time of day as a fraction of a day.
fn decimal_time<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let text = call.string(0)?;
    match parse_time_of_day(&text, call.e_ctx.time_zone) {
        Ok(fraction) => Ok(Evaluation::Number(fraction)),
        Err(err) => degrade(call, err, Evaluation::Number(f64::NAN)),
    }
}

fn format_date<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    format(call)
}

fn format_date_time<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    format(call)
}

fn format<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let value = call.arg(0)?;
    let pattern = call.string(1)?;
    match to_date_time(call, &value) {
        Ok(date) => Ok(Evaluation::String(date.format(&pattern))),
        Err(err) => degrade(call, err, Evaluation::String(String::new())),
    }
}
