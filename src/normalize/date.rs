//! Spreadsheet date-serial conversion.
//!
//! Serials count days from the 1899-12-30 epoch, so serial 25569 is the
//! Unix epoch. No plausibility checks are made: a nonsensical serial gives a
//! nonsensical label, and one outside the representable range gives
//! `"Invalid Date"`.

use crate::model::{CellValue, RawValue};
use chrono::{DateTime, Datelike, NaiveDate, TimeDelta};

/// Serial of 1970-01-01.
const UNIX_EPOCH_SERIAL: f64 = 25569.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Label used when a serial cannot be represented as a date.
pub const INVALID_DATE: &str = "Invalid Date";

/// Convert a date serial to an abbreviated month/year label such as `Jan-24`.
///
/// Non-numeric values pass through unchanged; they are already labels.
pub fn to_month_year(raw: &RawValue) -> CellValue {
    match raw {
        RawValue::Number(serial) | RawValue::Formatted(serial, _) => month_year_label(*serial),
        RawValue::Empty => CellValue::placeholder(),
        RawValue::Text(s) | RawValue::Error(s) => CellValue::Text(s.clone()),
        RawValue::Bool(b) => CellValue::Bool(*b),
    }
}

/// Format a serial as `%b-%y`, interpreted in UTC.
pub fn month_year_label(serial: f64) -> CellValue {
    let millis = (serial - UNIX_EPOCH_SERIAL) * MILLIS_PER_DAY;
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return CellValue::text(INVALID_DATE);
    }

    match DateTime::from_timestamp_millis(millis.round() as i64) {
        Some(dt) => CellValue::Text(dt.format("%b-%y").to_string()),
        None => CellValue::text(INVALID_DATE),
    }
}

/// Calendar fields of a day serial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SerialDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// 0 = Sunday
    pub weekday: u32,
}

/// Resolve a whole day serial the way spreadsheet applications do.
///
/// Serial 0 is the fictitious 1900-01-00 and serial 60 the fictitious
/// 1900-02-29; serials in between are one day off the real calendar.
pub(crate) fn serial_date(days: i64) -> Option<SerialDate> {
    let weekday = (days + 6).rem_euclid(7) as u32;
    let (year, month, day) = match days {
        d if d < 0 => return None,
        0 => (1900, 1, 0),
        60 => (1900, 2, 29),
        d => {
            let base = if d < 60 {
                NaiveDate::from_ymd_opt(1899, 12, 31)?
            } else {
                NaiveDate::from_ymd_opt(1899, 12, 30)?
            };
            let date = base.checked_add_signed(TimeDelta::try_days(d)?)?;
            (date.year(), date.month(), date.day())
        }
    };

    Some(SerialDate {
        year,
        month,
        day,
        weekday,
    })
}

/// Render a serial the way the default short date format shows it (`m/d/yy`).
///
/// Returns `None` for serials that do not map to a calendar date.
pub fn serial_to_short_date(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 || serial >= i64::MAX as f64 {
        return None;
    }

    let date = serial_date(serial.floor() as i64)?;
    Some(format!(
        "{}/{}/{:02}",
        date.month,
        date.day,
        date.year.rem_euclid(100)
    ))
}
