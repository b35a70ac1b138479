//! Catalog Repository
//!
//! Read access to products/variants plus the denormalized stock write-back.
//! Catalog CRUD itself belongs to the catalog service; `create_product` and
//! `create_variant` exist for seeding.

use super::{RepoError, RepoResult};
use shared::models::{CatalogProduct, CatalogVariant};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor, SqlitePool};

const PRODUCT_COLUMNS: &str = "id, name, image, price, stock, has_variants, is_active";
const VARIANT_COLUMNS: &str = "id, product_id, variant_key, name, price, stock";

pub async fn find_product(
    exec: impl SqliteExecutor<'_>,
    id: i64,
) -> RepoResult<Option<CatalogProduct>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id = ?");
    let product = sqlx::query_as::<_, CatalogProduct>(&sql)
        .bind(id)
        .fetch_optional(exec)
        .await?;
    Ok(product)
}

pub async fn find_variant(
    exec: impl SqliteExecutor<'_>,
    product_id: i64,
    variant_key: &str,
) -> RepoResult<Option<CatalogVariant>> {
    let sql =
        format!("SELECT {VARIANT_COLUMNS} FROM product_variant WHERE product_id = ? AND variant_key = ?");
    let variant = sqlx::query_as::<_, CatalogVariant>(&sql)
        .bind(product_id)
        .bind(variant_key)
        .fetch_optional(exec)
        .await?;
    Ok(variant)
}

/// Products by id, in no particular order (missing ids are skipped)
pub async fn find_products(
    exec: impl SqliteExecutor<'_>,
    ids: &[i64],
) -> RepoResult<Vec<CatalogProduct>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id IN ("));
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    let products = qb
        .build_query_as::<CatalogProduct>()
        .fetch_all(exec)
        .await?;
    Ok(products)
}

/// Mirror the ledger quantity onto the product row
pub async fn set_product_stock(
    conn: &mut SqliteConnection,
    product_id: i64,
    stock: i64,
) -> RepoResult<()> {
    let rows = sqlx::query("UPDATE product SET stock = ? WHERE id = ?")
        .bind(stock)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("product {product_id} not found")));
    }
    Ok(())
}

/// Mirror the ledger quantity onto the variant row
pub async fn set_variant_stock(
    conn: &mut SqliteConnection,
    product_id: i64,
    variant_key: &str,
    stock: i64,
) -> RepoResult<()> {
    let rows =
        sqlx::query("UPDATE product_variant SET stock = ? WHERE product_id = ? AND variant_key = ?")
            .bind(stock)
            .bind(product_id)
            .bind(variant_key)
            .execute(&mut *conn)
            .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "variant {variant_key} of product {product_id} not found"
        )));
    }
    Ok(())
}

pub async fn create_product(
    pool: &SqlitePool,
    name: &str,
    price: f64,
    image: Option<&str>,
) -> RepoResult<CatalogProduct> {
    let id = shared::util::snowflake_id();
    sqlx::query("INSERT INTO product (id, name, image, price, stock, has_variants, is_active) VALUES (?, ?, ?, ?, 0, 0, 1)")
        .bind(id)
        .bind(name)
        .bind(image)
        .bind(price)
        .execute(pool)
        .await?;
    find_product(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create product".into()))
}

pub async fn create_variant(
    pool: &SqlitePool,
    product_id: i64,
    variant_key: &str,
    name: &str,
    price: f64,
) -> RepoResult<CatalogVariant> {
    let mut tx = pool.begin().await?;
    let id = shared::util::snowflake_id();
    sqlx::query("INSERT INTO product_variant (id, product_id, variant_key, name, price, stock) VALUES (?, ?, ?, ?, ?, 0)")
        .bind(id)
        .bind(product_id)
        .bind(variant_key)
        .bind(name)
        .bind(price)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE product SET has_variants = 1 WHERE id = ?")
        .bind(product_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    find_variant(pool, product_id, variant_key)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create product variant".into()))
}
