//! Inventory Ledger Models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default low-stock threshold for new records
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Kind of quantity change recorded in the inventory log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum InventoryLogType {
    /// Restock
    Added,
    /// Order line decrement
    Sold,
    /// Manual correction (absolute quantity set)
    Adjusted,
    /// Stock put back (cancelled order, customer return)
    Returned,
}

impl InventoryLogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Sold => "sold",
            Self::Adjusted => "adjusted",
            Self::Returned => "returned",
        }
    }
}

impl fmt::Display for InventoryLogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current stock of one product/variant
///
/// `is_low_stock` is always `quantity <= low_stock_threshold`; it is written
/// by the stock mutator in the same statement as the quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub id: i64,
    pub product_id: i64,
    pub variant_key: Option<String>,
    pub quantity: i64,
    pub low_stock_threshold: i64,
    pub is_low_stock: bool,
    /// Optimistic concurrency token
    #[serde(skip)]
    pub version: i64,
    pub last_updated: i64,
}

impl InventoryRecord {
    pub fn low_stock_consistent(&self) -> bool {
        self.is_low_stock == (self.quantity <= self.low_stock_threshold)
    }
}

/// Immutable audit entry, one per quantity change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct InventoryLogEntry {
    pub id: i64,
    pub product_id: i64,
    pub variant_key: Option<String>,
    #[serde(rename = "type")]
    pub log_type: InventoryLogType,
    pub quantity_delta: i64,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub reason: Option<String>,
    /// Actor id, None for system actions
    pub performed_by: Option<String>,
    /// Originating order id
    pub reference: Option<String>,
    pub created_at: i64,
}

/// Paginated log query result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryLogPage {
    pub logs: Vec<InventoryLogEntry>,
    pub page: i64,
    pub pages: i64,
    pub total: i64,
}

/// Per-line stock movement reported back to the order caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChange {
    pub product_id: i64,
    pub variant_key: Option<String>,
    pub previous_quantity: i64,
    pub new_quantity: i64,
}

/// Order created through the fulfillment path, with its stock movements
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder<O> {
    pub order: O,
    pub stock_changes: Vec<StockChange>,
}

/// Result of replaying a record's log from zero
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerVerification {
    pub product_id: i64,
    pub variant_key: Option<String>,
    pub record_quantity: i64,
    pub replayed_quantity: i64,
    pub entry_count: i64,
    pub consistent: bool,
    pub low_stock_consistent: bool,
}

/// Add stock payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStockRequest {
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
}

/// Adjust inventory payload (absolute quantity)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustInventoryRequest {
    pub quantity: i64,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_type_wire_format() {
        assert_eq!(
            serde_json::to_string(&InventoryLogType::Returned).unwrap(),
            "\"returned\""
        );
        let t: InventoryLogType = serde_json::from_str("\"sold\"").unwrap();
        assert_eq!(t, InventoryLogType::Sold);
        assert!(serde_json::from_str::<InventoryLogType>("\"stolen\"").is_err());
    }

    #[test]
    fn test_log_entry_serializes_type_field() {
        let entry = InventoryLogEntry {
            id: 1,
            product_id: 5,
            variant_key: None,
            log_type: InventoryLogType::Sold,
            quantity_delta: -3,
            previous_quantity: 5,
            new_quantity: 2,
            reason: None,
            performed_by: Some("staff-1".into()),
            reference: Some("42".into()),
            created_at: 0,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "sold");
        assert_eq!(json["quantityDelta"], -3);
        assert_eq!(json["performedBy"], "staff-1");
    }

    #[test]
    fn test_low_stock_consistency() {
        let mut record = InventoryRecord {
            id: 1,
            product_id: 1,
            variant_key: None,
            quantity: 10,
            low_stock_threshold: 10,
            is_low_stock: true,
            version: 0,
            last_updated: 0,
        };
        assert!(record.low_stock_consistent());
        record.quantity = 11;
        assert!(!record.low_stock_consistent());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("version").is_none());
    }
}
