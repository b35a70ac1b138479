//! Authoritative line pricing from the catalog

use sqlx::SqliteConnection;

use crate::db::repository::catalog;
use crate::inventory::LedgerError;
use crate::inventory::mutator::variant_key_required;

/// Catalog name and unit price for one order line
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub name: String,
    pub unit_price: f64,
}

/// Look up the current price; a variant overrides the product price
///
/// Inactive products cannot be sold, and a product with variants is only
/// sold through one of its variants.
pub async fn resolve_line(
    conn: &mut SqliteConnection,
    product_id: i64,
    variant_key: Option<&str>,
) -> Result<PricedLine, LedgerError> {
    let not_found = || LedgerError::ProductNotFound {
        product_id,
        variant_key: variant_key.map(str::to_string),
    };
    let product = catalog::find_product(&mut *conn, product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(not_found)?;

    match variant_key {
        Some(key) => {
            let variant = catalog::find_variant(&mut *conn, product_id, key)
                .await?
                .ok_or_else(not_found)?;
            Ok(PricedLine {
                name: format!("{} ({})", product.name, variant.name),
                unit_price: variant.price,
            })
        }
        None if product.has_variants => Err(variant_key_required(product_id)),
        None => Ok(PricedLine {
            name: product.name,
            unit_price: product.price,
        }),
    }
}
