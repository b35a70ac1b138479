//! POS Order Model

use serde::{Deserialize, Serialize};

/// Name used when the sale has no customer attached
pub const WALK_IN_CUSTOMER: &str = "Walk-in Customer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum PosPaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Other,
}

impl PosPaymentMethod {
    /// Cash is settled at the counter, everything else starts pending
    pub fn initial_status(self) -> PosPaymentStatus {
        match self {
            Self::Cash => PosPaymentStatus::Completed,
            _ => PosPaymentStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum PosPaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// POS order line, every price field computed server-side
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct PosOrderItem {
    pub product_id: i64,
    pub variant_key: Option<String>,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
    pub subtotal: f64,
}

/// In-person sale
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct PosOrder {
    pub id: i64,
    /// `POS` + YYMMDD + 4-digit daily counter
    pub order_number: String,
    #[cfg_attr(feature = "db", sqlx(skip))]
    pub items: Vec<PosOrderItem>,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub staff_id: String,
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub discount_code: Option<String>,
    pub total_amount: f64,
    pub payment_method: PosPaymentMethod,
    pub payment_status: PosPaymentStatus,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Requested POS line (the client price is never read)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosItemInput {
    pub product_id: i64,
    #[serde(default)]
    pub variant_key: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosCustomerInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Create POS order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePosOrderRequest {
    pub items: Vec<PosItemInput>,
    #[serde(default)]
    pub customer: Option<PosCustomerInput>,
    pub subtotal: f64,
    #[serde(default)]
    pub tax: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub discount_code: Option<String>,
    pub total_amount: f64,
    pub payment_method: PosPaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Payment update payload, the only mutable part of a POS order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePosPaymentRequest {
    #[serde(default)]
    pub payment_status: Option<PosPaymentStatus>,
    #[serde(default)]
    pub payment_method: Option<PosPaymentMethod>,
}

/// Paginated POS order list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosOrderPage {
    pub orders: Vec<PosOrder>,
    pub page: i64,
    pub pages: i64,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_payment_status() {
        assert_eq!(
            PosPaymentMethod::Cash.initial_status(),
            PosPaymentStatus::Completed
        );
        assert_eq!(
            PosPaymentMethod::Card.initial_status(),
            PosPaymentStatus::Pending
        );
        assert_eq!(
            PosPaymentMethod::BankTransfer.initial_status(),
            PosPaymentStatus::Pending
        );
    }

    #[test]
    fn test_payment_method_wire_format() {
        let m: PosPaymentMethod = serde_json::from_str("\"bank_transfer\"").unwrap();
        assert_eq!(m, PosPaymentMethod::BankTransfer);
        assert!(serde_json::from_str::<PosPaymentMethod>("\"bitcoin\"").is_err());
    }
}
