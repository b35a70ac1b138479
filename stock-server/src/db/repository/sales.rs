//! Sales Read Models
//!
//! Raw per-order amounts and per-product sums for the statistics engine.
//! Bucketing happens in Rust because buckets follow the business timezone.

use super::RepoResult;
use sqlx::SqliteConnection;

/// Counted web orders: paid and not cancelled
const WEB_COUNTED: &str = "o.is_paid = 1 AND o.status != 'cancelled'";
/// Counted POS orders: payment completed
const POS_COUNTED: &str = "o.payment_status = 'completed'";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SaleRow {
    pub created_at: i64,
    pub amount: f64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductSalesRow {
    pub product_id: i64,
    pub quantity: i64,
    pub revenue: f64,
}

pub async fn web_sales(
    conn: &mut SqliteConnection,
    start: i64,
    end: i64,
) -> RepoResult<Vec<SaleRow>> {
    let sql = format!(
        "SELECT o.created_at, o.total_price AS amount FROM web_order o WHERE {WEB_COUNTED} AND o.created_at >= ? AND o.created_at < ? ORDER BY o.created_at"
    );
    let rows = sqlx::query_as::<_, SaleRow>(&sql)
        .bind(start)
        .bind(end)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

pub async fn pos_sales(
    conn: &mut SqliteConnection,
    start: i64,
    end: i64,
) -> RepoResult<Vec<SaleRow>> {
    let sql = format!(
        "SELECT o.created_at, o.total_amount AS amount FROM pos_order o WHERE {POS_COUNTED} AND o.created_at >= ? AND o.created_at < ? ORDER BY o.created_at"
    );
    let rows = sqlx::query_as::<_, SaleRow>(&sql)
        .bind(start)
        .bind(end)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

pub async fn web_product_sales(
    conn: &mut SqliteConnection,
    start: i64,
    end: i64,
) -> RepoResult<Vec<ProductSalesRow>> {
    let sql = format!(
        "SELECT i.product_id, SUM(i.quantity) AS quantity, SUM(i.quantity * i.price) AS revenue \
         FROM web_order_item i JOIN web_order o ON o.id = i.order_id \
         WHERE {WEB_COUNTED} AND o.created_at >= ? AND o.created_at < ? \
         GROUP BY i.product_id"
    );
    let rows = sqlx::query_as::<_, ProductSalesRow>(&sql)
        .bind(start)
        .bind(end)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

pub async fn pos_product_sales(
    conn: &mut SqliteConnection,
    start: i64,
    end: i64,
) -> RepoResult<Vec<ProductSalesRow>> {
    let sql = format!(
        "SELECT i.product_id, SUM(i.quantity) AS quantity, SUM(i.subtotal) AS revenue \
         FROM pos_order_item i JOIN pos_order o ON o.id = i.order_id \
         WHERE {POS_COUNTED} AND o.created_at >= ? AND o.created_at < ? \
         GROUP BY i.product_id"
    );
    let rows = sqlx::query_as::<_, ProductSalesRow>(&sql)
        .bind(start)
        .bind(end)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}
