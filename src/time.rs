//! Schedule time codec.
//!
//! GTFS times are `H:M:S` strings measured from the start of the service
//! day. Hours are unbounded: a trip that runs past midnight keeps counting
//! (`25:10:00`), and all graph arithmetic works on that raw value.
//! [`normalize`] folds hours into a single day and is only meant for display.

use itertools::Itertools;

use crate::error::TimeFormatError;

/// Minutes since the start of the service day, with fractional seconds.
pub type Minutes = f64;

pub const MINUTES_PER_DAY: Minutes = 24.0 * 60.0;

fn hms(time_str: &str) -> Result<(u64, u64, u64), TimeFormatError> {
    let malformed = || TimeFormatError::Malformed(time_str.to_owned());

    let (h, m, s) = time_str
        .split(':')
        .map(|part| part.trim().parse::<u64>())
        .collect_tuple()
        .ok_or_else(malformed)?;

    Ok((
        h.map_err(|_| malformed())?,
        m.map_err(|_| malformed())?,
        s.map_err(|_| malformed())?,
    ))
}

fn to_minutes(h: u64, m: u64, s: u64) -> Minutes {
    h as Minutes * 60.0 + m as Minutes + s as Minutes / 60.0
}

/// Decode a schedule time, preserving hours past 24.
pub fn decode(time_str: &str) -> Result<Minutes, TimeFormatError> {
    let (h, m, s) = hms(time_str)?;
    Ok(to_minutes(h, m, s))
}

/// Decode a schedule time with the hour reduced modulo 24.
///
/// Never use the result for ordering or relaxation: `25:10:00` becomes
/// `01:10:00` and would sort before the trips that precede it.
pub fn normalize(time_str: &str) -> Result<Minutes, TimeFormatError> {
    let (h, m, s) = hms(time_str)?;
    Ok(to_minutes(h % 24, m, s))
}

/// Fold a raw minute value onto a single 24 hour clock face.
pub fn wrap_day(minutes: Minutes) -> Minutes {
    minutes.rem_euclid(MINUTES_PER_DAY)
}

/// Format minutes as `HH:MM:SS`, rounded to the second. Hours are not wrapped.
pub fn format_clock(minutes: Minutes) -> String {
    let total = (minutes * 60.0).round().max(0.0) as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
