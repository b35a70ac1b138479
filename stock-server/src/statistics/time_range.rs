//! Reporting windows and chart buckets

use chrono::{Datelike, Duration, NaiveDate, Timelike};
use chrono_tz::Tz;
use shared::models::{Granularity, StatsPeriod};

use crate::inventory::LedgerError;
use crate::utils::time::{day_end_millis, day_start_millis, millis_to_local};

/// Spans up to this many days are charted per hour
const HOURLY_MAX_DAYS: i64 = 2;
/// Spans up to this many days are charted per day
const DAILY_MAX_DAYS: i64 = 60;

/// `[start, end)` in Unix millis plus the chart bucket size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
    pub granularity: Granularity,
}

pub fn granularity_for_span(days: i64) -> Granularity {
    if days <= HOURLY_MAX_DAYS {
        Granularity::Hour
    } else if days <= DAILY_MAX_DAYS {
        Granularity::Day
    } else {
        Granularity::Month
    }
}

/// Window for a named period ending with `today` (inclusive)
pub fn period_window(period: StatsPeriod, today: NaiveDate, tz: Tz) -> TimeWindow {
    let (first_day, granularity) = match period {
        StatsPeriod::Today => (today, Granularity::Hour),
        StatsPeriod::Week => {
            let from_monday = today.weekday().num_days_from_monday();
            (today - Duration::days(from_monday as i64), Granularity::Day)
        }
        StatsPeriod::Month => (today.with_day(1).unwrap_or(today), Granularity::Day),
        StatsPeriod::Year => (
            today.with_month(1).and_then(|d| d.with_day(1)).unwrap_or(today),
            Granularity::Month,
        ),
    };
    TimeWindow {
        start: day_start_millis(first_day, tz),
        end: day_end_millis(today, tz),
        granularity,
    }
}

/// Window for an explicit inclusive date range
pub fn range_window(
    start_date: NaiveDate,
    end_date: NaiveDate,
    tz: Tz,
) -> Result<TimeWindow, LedgerError> {
    if start_date > end_date {
        return Err(LedgerError::Validation(format!(
            "startDate {start_date} is after endDate {end_date}"
        )));
    }
    let days = (end_date - start_date).num_days() + 1;
    Ok(TimeWindow {
        start: day_start_millis(start_date, tz),
        end: day_end_millis(end_date, tz),
        granularity: granularity_for_span(days),
    })
}

/// An explicit range wins over a period; neither means this month
pub fn resolve_window(
    period: Option<StatsPeriod>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    today: NaiveDate,
    tz: Tz,
) -> Result<TimeWindow, LedgerError> {
    match (start_date, end_date) {
        (Some(start), Some(end)) => range_window(start, end, tz),
        (None, None) => Ok(period_window(
            period.unwrap_or(StatsPeriod::Month),
            today,
            tz,
        )),
        _ => Err(LedgerError::Validation(
            "startDate and endDate must be given together".into(),
        )),
    }
}

/// Bucket label in the business timezone
pub fn bucket_label(millis: i64, granularity: Granularity, tz: Tz) -> String {
    let local = millis_to_local(millis, tz);
    match granularity {
        Granularity::Hour => format!("{} {:02}:00", local.format("%Y-%m-%d"), local.hour()),
        Granularity::Day => local.format("%Y-%m-%d").to_string(),
        Granularity::Month => local.format("%Y-%m").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_granularity_thresholds() {
        assert_eq!(granularity_for_span(1), Granularity::Hour);
        assert_eq!(granularity_for_span(2), Granularity::Hour);
        assert_eq!(granularity_for_span(3), Granularity::Day);
        assert_eq!(granularity_for_span(60), Granularity::Day);
        assert_eq!(granularity_for_span(61), Granularity::Month);
    }

    #[test]
    fn test_range_window_is_inclusive_of_end_day() {
        let w = range_window(date("2024-03-01"), date("2024-03-03"), Tz::UTC).unwrap();
        assert_eq!(w.granularity, Granularity::Day);
        assert_eq!(w.end - w.start, 3 * 24 * 3600 * 1000);

        let w = range_window(date("2024-03-01"), date("2024-03-02"), Tz::UTC).unwrap();
        assert_eq!(w.granularity, Granularity::Hour);

        assert!(range_window(date("2024-03-05"), date("2024-03-01"), Tz::UTC).is_err());
    }

    #[test]
    fn test_period_windows() {
        // 2024-03-14 is a Thursday
        let today = date("2024-03-14");
        let w = period_window(StatsPeriod::Week, today, Tz::UTC);
        assert_eq!(w.start, day_start_millis(date("2024-03-11"), Tz::UTC));
        assert_eq!(w.end, day_start_millis(date("2024-03-15"), Tz::UTC));

        let w = period_window(StatsPeriod::Today, today, Tz::UTC);
        assert_eq!(w.granularity, Granularity::Hour);
        assert_eq!(w.end - w.start, 24 * 3600 * 1000);

        let w = period_window(StatsPeriod::Month, today, Tz::UTC);
        assert_eq!(w.start, day_start_millis(date("2024-03-01"), Tz::UTC));

        let w = period_window(StatsPeriod::Year, today, Tz::UTC);
        assert_eq!(w.start, day_start_millis(date("2024-01-01"), Tz::UTC));
        assert_eq!(w.granularity, Granularity::Month);
    }

    #[test]
    fn test_resolve_window() {
        let today = date("2024-03-14");
        let w = resolve_window(None, None, None, today, Tz::UTC).unwrap();
        assert_eq!(w, period_window(StatsPeriod::Month, today, Tz::UTC));

        let w = resolve_window(
            Some(StatsPeriod::Year),
            Some(date("2024-03-01")),
            Some(date("2024-03-03")),
            today,
            Tz::UTC,
        )
        .unwrap();
        assert_eq!(w.granularity, Granularity::Day);

        assert!(resolve_window(None, Some(today), None, today, Tz::UTC).is_err());
    }

    #[test]
    fn test_bucket_labels_use_business_timezone() {
        let ms = chrono::Utc
            .with_ymd_and_hms(2024, 3, 15, 23, 30, 0)
            .unwrap()
            .timestamp_millis();
        assert_eq!(bucket_label(ms, Granularity::Hour, Tz::UTC), "2024-03-15 23:00");
        assert_eq!(bucket_label(ms, Granularity::Day, Tz::UTC), "2024-03-15");
        assert_eq!(bucket_label(ms, Granularity::Month, Tz::UTC), "2024-03");
        let shanghai = chrono_tz::Asia::Shanghai;
        assert_eq!(bucket_label(ms, Granularity::Hour, shanghai), "2024-03-16 07:00");
    }
}
