//! Time helpers - business timezone conversion
//!
//! Date → timestamp conversion happens in handlers and services;
//! repositories only take `i64` Unix millis.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

use super::{AppError, AppResult};

/// Parse a date string (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// Parse a timezone name, falling back to UTC
pub fn parse_timezone(name: &str) -> Tz {
    name.parse::<Tz>().unwrap_or_else(|_| {
        tracing::warn!("Invalid timezone '{}', falling back to UTC", name);
        Tz::UTC
    })
}

/// Date + time of day → Unix millis (business timezone)
///
/// DST gap fallback: a local time that does not exist is read as UTC.
pub fn date_hms_to_millis(date: NaiveDate, hour: u32, min: u32, sec: u32, tz: Tz) -> i64 {
    let naive = date
        .and_hms_opt(hour, min, sec)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN));
    naive
        .and_local_timezone(tz)
        .latest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// Start of day (00:00:00) → Unix millis (business timezone)
pub fn day_start_millis(date: NaiveDate, tz: Tz) -> i64 {
    date_hms_to_millis(date, 0, 0, 0, tz)
}

/// End of day → Unix millis of the next day's 00:00:00 (business timezone)
///
/// Callers compare with `< end` (exclusive).
pub fn day_end_millis(date: NaiveDate, tz: Tz) -> i64 {
    let next_day = date.succ_opt().unwrap_or(date);
    date_hms_to_millis(next_day, 0, 0, 0, tz)
}

/// Unix millis → business timezone time
pub fn millis_to_local(millis: i64, tz: Tz) -> DateTime<Tz> {
    tz.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(|| chrono::Utc::now().with_timezone(&tz))
}

/// Today in the business timezone
pub fn today(tz: Tz) -> NaiveDate {
    chrono::Utc::now().with_timezone(&tz).date_naive()
}
