//! Serial numbers of the 1900 date system.
//!
//! Serial 1 is 1900-01-01 and serial 60 is the phantom 1900-02-29 that the
//! legacy format inherited, so every later date is one day further from
//! the epoch than the calendar says. Serial 0 reads as "1900-01-00".

use biffcalc_common::ErrorCode;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// The phantom leap day.
const PHANTOM_LEAP_SERIAL: i64 = 60;

/// 9999-12-31, the last representable date.
pub const MAX_SERIAL: f64 = 2_958_465.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

fn day_zero() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 31).unwrap_or_default()
}

fn first_real_day_after_phantom() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 3, 1).unwrap_or_default()
}

pub fn date_to_serial(date: &NaiveDate) -> f64 {
    let days = date.signed_duration_since(day_zero()).num_days();
    let serial = if *date >= first_real_day_after_phantom() {
        days + 1
    } else {
        days
    };
    serial as f64
}

pub fn datetime_to_serial(dt: &NaiveDateTime) -> f64 {
    let secs = dt.time().num_seconds_from_midnight() as f64;
    date_to_serial(&dt.date()) + secs / SECONDS_PER_DAY
}

/// Calendar parts `(year, month, day)` of a serial. Negative serials and
/// serials past 9999-12-31 are `#NUM!`.
pub fn serial_to_ymd(serial: f64) -> Result<(i32, u32, u32), ErrorCode> {
    if !(0.0..MAX_SERIAL + 1.0).contains(&serial) {
        return Err(ErrorCode::NumOverflow);
    }
    let n = serial.floor() as i64;
    match n {
        0 => Ok((1900, 1, 0)),
        PHANTOM_LEAP_SERIAL => Ok((1900, 2, 29)),
        _ => {
            let offset = if n > PHANTOM_LEAP_SERIAL { n - 1 } else { n };
            let date = day_zero()
                .checked_add_signed(chrono::Duration::days(offset))
                .ok_or(ErrorCode::NumOverflow)?;
            Ok((date.year(), date.month(), date.day()))
        }
    }
}

/// `(hour, minute, second)` of the serial's fraction, rounded to the
/// nearest second.
pub fn serial_to_hms(serial: f64) -> Result<(u32, u32, u32), ErrorCode> {
    if serial < 0.0 || !serial.is_finite() {
        return Err(ErrorCode::NumOverflow);
    }
    let secs = ((serial - serial.floor()) * SECONDS_PER_DAY).round() as u32 % 86_400;
    Ok((secs / 3600, secs / 60 % 60, secs % 60))
}

/// Serial of `year-month-day` where month and day may overflow in either
/// direction (`DATE(2008, 14, 0)` is 2009-01-31).
pub fn normalized_date_serial(year: i64, month: i64, day: i64) -> Result<f64, ErrorCode> {
    let months = year
        .checked_mul(12)
        .and_then(|m| m.checked_add(month))
        .and_then(|m| m.checked_sub(1))
        .ok_or(ErrorCode::NumOverflow)?;
    let y = months.div_euclid(12);
    let m = months.rem_euclid(12) + 1;
    if !(1900..=9999).contains(&y) {
        return Err(ErrorCode::NumOverflow);
    }
    let first = NaiveDate::from_ymd_opt(y as i32, m as u32, 1).ok_or(ErrorCode::NumOverflow)?;
    let serial = date_to_serial(&first) + (day as f64 - 1.0);
    if !(0.0..=MAX_SERIAL).contains(&serial) {
        return Err(ErrorCode::NumOverflow);
    }
    Ok(serial)
}

/// Day of week with 0 = Sunday. Serial 1 is a Sunday in this system.
pub fn weekday_from_sunday(serial: f64) -> Result<u32, ErrorCode> {
    if serial < 0.0 || serial >= MAX_SERIAL + 1.0 {
        return Err(ErrorCode::NumOverflow);
    }
    Ok(((serial.floor() as i64 + 6) % 7) as u32)
}
