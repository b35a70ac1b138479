//! POS order number counter

use super::RepoResult;
use sqlx::SqliteConnection;

/// Next value of the per-day counter (starts at 1)
///
/// Single upsert statement, so two checkouts can never read the same value.
pub async fn next_value(conn: &mut SqliteConnection, day: &str) -> RepoResult<i64> {
    let value: i64 = sqlx::query_scalar(
        "INSERT INTO pos_order_sequence (day, last_value) VALUES (?, 1) ON CONFLICT(day) DO UPDATE SET last_value = last_value + 1 RETURNING last_value",
    )
    .bind(day)
    .fetch_one(&mut *conn)
    .await?;
    Ok(value)
}
