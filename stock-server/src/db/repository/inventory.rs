//! Inventory Record Repository

use super::{RepoError, RepoResult, variant_column};
use shared::models::InventoryRecord;
use sqlx::{SqliteConnection, SqliteExecutor};

const COLUMNS: &str = "id, product_id, NULLIF(variant_key, '') AS variant_key, quantity, low_stock_threshold, is_low_stock, version, last_updated";

pub async fn find_by_key(
    exec: impl SqliteExecutor<'_>,
    product_id: i64,
    variant_key: Option<&str>,
) -> RepoResult<Option<InventoryRecord>> {
    let sql = format!("SELECT {COLUMNS} FROM inventory WHERE product_id = ? AND variant_key = ?");
    let record = sqlx::query_as::<_, InventoryRecord>(&sql)
        .bind(product_id)
        .bind(variant_column(variant_key))
        .fetch_optional(exec)
        .await?;
    Ok(record)
}

/// Claim the record for writing and return its current state
///
/// Bumps `version` as its first statement, so the enclosing transaction
/// holds the database write lock before the quantity is read. Returns
/// `None` (still holding the lock) when no record exists for the key.
pub async fn lock_by_key(
    conn: &mut SqliteConnection,
    product_id: i64,
    variant_key: Option<&str>,
) -> RepoResult<Option<InventoryRecord>> {
    let sql = format!(
        "UPDATE inventory SET version = version + 1 WHERE product_id = ? AND variant_key = ? RETURNING {COLUMNS}"
    );
    let record = sqlx::query_as::<_, InventoryRecord>(&sql)
        .bind(product_id)
        .bind(variant_column(variant_key))
        .fetch_optional(&mut *conn)
        .await?;
    Ok(record)
}

pub async fn find_all(
    exec: impl SqliteExecutor<'_>,
    low_stock_only: bool,
) -> RepoResult<Vec<InventoryRecord>> {
    let filter = if low_stock_only {
        "WHERE is_low_stock = 1 "
    } else {
        ""
    };
    let sql = format!("SELECT {COLUMNS} FROM inventory {filter}ORDER BY product_id, variant_key");
    let records = sqlx::query_as::<_, InventoryRecord>(&sql)
        .fetch_all(exec)
        .await?;
    Ok(records)
}

/// Create an empty record (quantity 0)
pub async fn insert(
    conn: &mut SqliteConnection,
    product_id: i64,
    variant_key: Option<&str>,
    low_stock_threshold: i64,
    now: i64,
) -> RepoResult<InventoryRecord> {
    let sql = format!(
        "INSERT INTO inventory (product_id, variant_key, quantity, low_stock_threshold, is_low_stock, version, last_updated) VALUES (?, ?, 0, ?, ?, 0, ?) RETURNING {COLUMNS}"
    );
    let record = sqlx::query_as::<_, InventoryRecord>(&sql)
        .bind(product_id)
        .bind(variant_column(variant_key))
        .bind(low_stock_threshold)
        .bind(0 <= low_stock_threshold)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;
    Ok(record)
}

/// Compare-and-swap write of quantity, threshold and the derived flag
///
/// Fails with `RepoError::Busy` when `expected_version` no longer matches.
pub async fn update_quantity(
    conn: &mut SqliteConnection,
    id: i64,
    expected_version: i64,
    quantity: i64,
    low_stock_threshold: i64,
    now: i64,
) -> RepoResult<InventoryRecord> {
    let sql = format!(
        "UPDATE inventory SET quantity = ?, low_stock_threshold = ?, is_low_stock = ?, version = version + 1, last_updated = ? WHERE id = ? AND version = ? RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, InventoryRecord>(&sql)
        .bind(quantity)
        .bind(low_stock_threshold)
        .bind(quantity <= low_stock_threshold)
        .bind(now)
        .bind(id)
        .bind(expected_version)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| {
            RepoError::Busy(format!(
                "inventory {id} changed concurrently (expected version {expected_version})"
            ))
        })
}
