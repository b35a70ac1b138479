//! Inventory Log Repository
//!
//! Append-only: there is no update or delete here, and triggers reject both.

use super::{RepoResult, page_count, variant_column};
use shared::models::{InventoryLogEntry, InventoryLogPage, InventoryLogType};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor, SqlitePool};

const COLUMNS: &str = "id, product_id, NULLIF(variant_key, '') AS variant_key, log_type, quantity_delta, previous_quantity, new_quantity, reason, performed_by, reference, created_at";

/// Entry to append, `quantity_delta` is derived from previous/new
#[derive(Debug, Clone)]
pub struct NewLogEntry<'a> {
    pub inventory_id: i64,
    pub product_id: i64,
    pub variant_key: Option<&'a str>,
    pub log_type: InventoryLogType,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub reason: Option<&'a str>,
    pub performed_by: Option<&'a str>,
    pub reference: Option<&'a str>,
    pub created_at: i64,
}

pub async fn append(
    conn: &mut SqliteConnection,
    entry: NewLogEntry<'_>,
) -> RepoResult<InventoryLogEntry> {
    let sql = format!(
        "INSERT INTO inventory_log (inventory_id, product_id, variant_key, log_type, quantity_delta, previous_quantity, new_quantity, reason, performed_by, reference, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    );
    let created = sqlx::query_as::<_, InventoryLogEntry>(&sql)
        .bind(entry.inventory_id)
        .bind(entry.product_id)
        .bind(variant_column(entry.variant_key))
        .bind(entry.log_type)
        .bind(entry.new_quantity - entry.previous_quantity)
        .bind(entry.previous_quantity)
        .bind(entry.new_quantity)
        .bind(entry.reason)
        .bind(entry.performed_by)
        .bind(entry.reference)
        .bind(entry.created_at)
        .fetch_one(&mut *conn)
        .await?;
    Ok(created)
}

/// All entries of one record, in creation order
pub async fn find_for_key(
    exec: impl SqliteExecutor<'_>,
    product_id: i64,
    variant_key: Option<&str>,
) -> RepoResult<Vec<InventoryLogEntry>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM inventory_log WHERE product_id = ? AND variant_key = ? ORDER BY id ASC"
    );
    let entries = sqlx::query_as::<_, InventoryLogEntry>(&sql)
        .bind(product_id)
        .bind(variant_column(variant_key))
        .fetch_all(exec)
        .await?;
    Ok(entries)
}

/// Log query filters, all optional; times are Unix millis
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub product_id: Option<i64>,
    pub variant_key: Option<String>,
    pub log_type: Option<InventoryLogType>,
    pub reference: Option<String>,
    /// Inclusive
    pub start: Option<i64>,
    /// Exclusive
    pub end: Option<i64>,
}

fn push_filter<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a LogFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(product_id) = filter.product_id {
        qb.push(" AND product_id = ").push_bind(product_id);
    }
    if let Some(variant_key) = &filter.variant_key {
        qb.push(" AND variant_key = ").push_bind(variant_key.as_str());
    }
    if let Some(log_type) = filter.log_type {
        qb.push(" AND log_type = ").push_bind(log_type);
    }
    if let Some(reference) = &filter.reference {
        qb.push(" AND reference = ").push_bind(reference.as_str());
    }
    if let Some(start) = filter.start {
        qb.push(" AND created_at >= ").push_bind(start);
    }
    if let Some(end) = filter.end {
        qb.push(" AND created_at < ").push_bind(end);
    }
}

/// Filtered page of entries, newest first
pub async fn query(
    pool: &SqlitePool,
    filter: &LogFilter,
    page: i64,
    limit: i64,
) -> RepoResult<InventoryLogPage> {
    let mut count_qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM inventory_log");
    push_filter(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {COLUMNS} FROM inventory_log"));
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind((page - 1) * limit);
    let logs = qb
        .build_query_as::<InventoryLogEntry>()
        .fetch_all(pool)
        .await?;

    Ok(InventoryLogPage {
        logs,
        page,
        pages: page_count(total, limit),
        total,
    })
}
