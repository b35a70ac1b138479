//! Web Order Repository

use super::{RepoResult, page_count, variant_column};
use shared::models::{Order, OrderItem, OrderPage, OrderStatus};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor, SqlitePool};

const COLUMNS: &str = "id, user_id, shipping_address, billing_address, payment_method, status, is_paid, paid_at, payment_reference, subtotal, tax, shipping_cost, total_price, created_at, updated_at";
const ITEM_COLUMNS: &str = "product_id, NULLIF(variant_key, '') AS variant_key, name, quantity, price";

/// Insert the order row and its lines
pub async fn insert(conn: &mut SqliteConnection, order: &Order) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO web_order (id, user_id, shipping_address, billing_address, payment_method, status, is_paid, paid_at, payment_reference, subtotal, tax, shipping_cost, total_price, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(order.id)
    .bind(&order.user_id)
    .bind(Json(&order.shipping_address))
    .bind(Json(&order.billing_address))
    .bind(&order.payment_method)
    .bind(order.status)
    .bind(order.is_paid)
    .bind(order.paid_at)
    .bind(&order.payment_reference)
    .bind(order.subtotal)
    .bind(order.tax)
    .bind(order.shipping_cost)
    .bind(order.total_price)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    for item in &order.items {
        sqlx::query(
            "INSERT INTO web_order_item (order_id, product_id, variant_key, name, quantity, price) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(order.id)
        .bind(item.product_id)
        .bind(variant_column(item.variant_key.as_deref()))
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.price)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn load_items(
    exec: impl SqliteExecutor<'_>,
    order_id: i64,
) -> RepoResult<Vec<OrderItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM web_order_item WHERE order_id = ? ORDER BY id");
    let items = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order_id)
        .fetch_all(exec)
        .await?;
    Ok(items)
}

/// Order with its lines
pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<Order>> {
    let sql = format!("SELECT {COLUMNS} FROM web_order WHERE id = ?");
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match order {
        Some(mut order) => {
            order.items = load_items(&mut *conn, id).await?;
            Ok(Some(order))
        }
        None => Ok(None),
    }
}

/// Newest first, optionally filtered by status and owner
pub async fn list(
    pool: &SqlitePool,
    status: Option<OrderStatus>,
    user_id: Option<&str>,
    page: i64,
    limit: i64,
) -> RepoResult<OrderPage> {
    fn push_filter<'a>(
        qb: &mut QueryBuilder<'a, Sqlite>,
        status: Option<OrderStatus>,
        user_id: Option<&'a str>,
    ) {
        qb.push(" WHERE 1 = 1");
        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(user_id) = user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
    }

    let mut count_qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM web_order");
    push_filter(&mut count_qb, status, user_id);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!("SELECT {COLUMNS} FROM web_order"));
    push_filter(&mut qb, status, user_id);
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind((page - 1) * limit);
    let mut orders = qb.build_query_as::<Order>().fetch_all(pool).await?;
    for order in &mut orders {
        order.items = load_items(pool, order.id).await?;
    }

    Ok(OrderPage {
        orders,
        page,
        pages: page_count(total, limit),
        total,
    })
}

/// Returns false when the order does not exist
pub async fn update_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: OrderStatus,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE web_order SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Returns false when the order is already paid (or missing)
pub async fn mark_paid(
    conn: &mut SqliteConnection,
    id: i64,
    payment_reference: Option<&str>,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE web_order SET is_paid = 1, paid_at = ?, payment_reference = ?, updated_at = ? WHERE id = ? AND is_paid = 0",
    )
    .bind(now)
    .bind(payment_reference)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}
