//! POS order numbers: `POS` + YYMMDD + per-day counter
//!
//! The counter comes from one atomic upsert inside the order transaction,
//! so concurrent terminals never compute the same number.

use chrono_tz::Tz;
use sqlx::SqliteConnection;

use crate::db::repository::pos_sequence;
use crate::inventory::LedgerError;
use crate::utils::time::millis_to_local;

const PREFIX: &str = "POS";

/// YYMMDD of `now` in the business timezone
pub fn day_code(now: i64, tz: Tz) -> String {
    millis_to_local(now, tz).format("%y%m%d").to_string()
}

/// Counters past 9999 keep growing in width
pub fn format_order_number(day: &str, seq: i64) -> String {
    format!("{PREFIX}{day}{seq:04}")
}

/// Take the next number for the business day of `now`
pub async fn allocate(
    conn: &mut SqliteConnection,
    now: i64,
    tz: Tz,
) -> Result<String, LedgerError> {
    let day = day_code(now, tz);
    let seq = pos_sequence::next_value(conn, &day).await?;
    Ok(format_order_number(&day, seq))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use chrono::TimeZone;

    #[test]
    fn test_format_order_number() {
        assert_eq!(format_order_number("240315", 1), "POS2403150001");
        assert_eq!(format_order_number("240315", 42), "POS2403150042");
        assert_eq!(format_order_number("240315", 12345), "POS24031512345");
    }

    #[test]
    fn test_day_code_follows_business_timezone() {
        // 2024-03-15 23:30 UTC is already the 16th in Shanghai
        let now = chrono::Utc
            .with_ymd_and_hms(2024, 3, 15, 23, 30, 0)
            .unwrap()
            .timestamp_millis();
        assert_eq!(day_code(now, Tz::UTC), "240315");
        assert_eq!(day_code(now, chrono_tz::Asia::Shanghai), "240316");
    }

    #[tokio::test]
    async fn test_allocate_is_sequential_per_day() {
        let db = DbService::open_in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let day1 = chrono::Utc
            .with_ymd_and_hms(2024, 3, 15, 10, 0, 0)
            .unwrap()
            .timestamp_millis();
        let day2 = day1 + 24 * 3600 * 1000;

        assert_eq!(allocate(&mut conn, day1, Tz::UTC).await.unwrap(), "POS2403150001");
        assert_eq!(allocate(&mut conn, day1, Tz::UTC).await.unwrap(), "POS2403150002");
        assert_eq!(allocate(&mut conn, day2, Tz::UTC).await.unwrap(), "POS2403160001");
        assert_eq!(allocate(&mut conn, day1, Tz::UTC).await.unwrap(), "POS2403150003");
    }
}
