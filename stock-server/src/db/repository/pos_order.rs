//! POS Order Repository

use super::{RepoResult, page_count, variant_column};
use shared::models::{PosOrder, PosOrderItem, PosOrderPage, PosPaymentMethod, PosPaymentStatus};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor, SqlitePool};

const COLUMNS: &str = "id, order_number, customer_id, customer_name, staff_id, subtotal, tax, discount, discount_code, total_amount, payment_method, payment_status, notes, created_at, updated_at";
const ITEM_COLUMNS: &str =
    "product_id, NULLIF(variant_key, '') AS variant_key, name, quantity, price, subtotal";

pub async fn insert(conn: &mut SqliteConnection, order: &PosOrder) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO pos_order (id, order_number, customer_id, customer_name, staff_id, subtotal, tax, discount, discount_code, total_amount, payment_method, payment_status, notes, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(order.id)
    .bind(&order.order_number)
    .bind(&order.customer_id)
    .bind(&order.customer_name)
    .bind(&order.staff_id)
    .bind(order.subtotal)
    .bind(order.tax)
    .bind(order.discount)
    .bind(&order.discount_code)
    .bind(order.total_amount)
    .bind(order.payment_method)
    .bind(order.payment_status)
    .bind(&order.notes)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    for item in &order.items {
        sqlx::query(
            "INSERT INTO pos_order_item (order_id, product_id, variant_key, name, quantity, price, subtotal) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order.id)
        .bind(item.product_id)
        .bind(variant_column(item.variant_key.as_deref()))
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.price)
        .bind(item.subtotal)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn load_items(
    exec: impl SqliteExecutor<'_>,
    order_id: i64,
) -> RepoResult<Vec<PosOrderItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM pos_order_item WHERE order_id = ? ORDER BY id");
    let items = sqlx::query_as::<_, PosOrderItem>(&sql)
        .bind(order_id)
        .fetch_all(exec)
        .await?;
    Ok(items)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<PosOrder>> {
    let sql = format!("SELECT {COLUMNS} FROM pos_order WHERE id = ?");
    let order = sqlx::query_as::<_, PosOrder>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match order {
        Some(mut order) => {
            order.items = load_items(pool, id).await?;
            Ok(Some(order))
        }
        None => Ok(None),
    }
}

/// Newest first; `start`/`end` are Unix millis, end exclusive
pub async fn list(
    pool: &SqlitePool,
    start: Option<i64>,
    end: Option<i64>,
    page: i64,
    limit: i64,
) -> RepoResult<PosOrderPage> {
    fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, start: Option<i64>, end: Option<i64>) {
        qb.push(" WHERE 1 = 1");
        if let Some(start) = start {
            qb.push(" AND created_at >= ").push_bind(start);
        }
        if let Some(end) = end {
            qb.push(" AND created_at < ").push_bind(end);
        }
    }

    let mut count_qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM pos_order");
    push_filter(&mut count_qb, start, end);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!("SELECT {COLUMNS} FROM pos_order"));
    push_filter(&mut qb, start, end);
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind((page - 1) * limit);
    let mut orders = qb.build_query_as::<PosOrder>().fetch_all(pool).await?;
    for order in &mut orders {
        order.items = load_items(pool, order.id).await?;
    }

    Ok(PosOrderPage {
        orders,
        page,
        pages: page_count(total, limit),
        total,
    })
}

/// Returns false when the order does not exist
pub async fn update_payment(
    pool: &SqlitePool,
    id: i64,
    status: PosPaymentStatus,
    method: PosPaymentMethod,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE pos_order SET payment_status = ?, payment_method = ?, updated_at = ? WHERE id = ?",
    )
    .bind(status)
    .bind(method)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}
