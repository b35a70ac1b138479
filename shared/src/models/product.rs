//! Catalog Model
//!
//! The catalog is owned elsewhere; the ledger only reads prices and names
//! and writes back the denormalized `stock` field.

use serde::{Deserialize, Serialize};

/// Catalog product
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub id: i64,
    pub name: String,
    pub image: Option<String>,
    /// Unit price (authoritative for checkout)
    pub price: f64,
    /// Denormalized stock, mirrors the inventory record without variant
    pub stock: i64,
    pub has_variants: bool,
    pub is_active: bool,
}

/// Catalog variant (size, print, material ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CatalogVariant {
    pub id: i64,
    pub product_id: i64,
    /// Key shared with the inventory record, unique per product
    pub variant_key: String,
    pub name: String,
    /// Unit price, overrides the product price
    pub price: f64,
    /// Denormalized stock, mirrors the inventory record of this variant
    pub stock: i64,
}
